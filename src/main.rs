// src/main.rs
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trailer_load_planner::api;
use trailer_load_planner::config::AppConfig;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(err) = dotenv_result {
        let missing_file = matches!(
            err,
            dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        );
        if !missing_file {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let planner_settings = app_config.planner.clone();

    info!("🚛 Load planner starting...");
    if let Err(err) = api::start_api_server(api_config, planner_settings).await {
        error!("❌ Server stopped: {}", err);
        std::process::exit(1);
    }
}
