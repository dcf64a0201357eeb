use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::model::TrailerPreset;
use crate::planner::PlannerConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    /// Creates a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            planner: PlannerSettings::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "LOAD_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "LOAD_PLANNER_API_PORT";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let host_value =
            env_string(lookup, Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (default_ip, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match env_string(lookup, Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the load planner.
#[derive(Clone, Debug)]
pub struct PlannerSettings {
    planner: PlannerConfig,
}

impl PlannerSettings {
    const TRAILER_VAR: &'static str = "LOAD_PLANNER_DEFAULT_TRAILER";
    const MAX_PAYLOAD_VAR: &'static str = "LOAD_PLANNER_MAX_PAYLOAD";
    const FIT_TOLERANCE_VAR: &'static str = "LOAD_PLANNER_FIT_TOLERANCE";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let default_trailer = match env_string(lookup, Self::TRAILER_VAR) {
            Some(raw) => match raw.parse::<TrailerPreset>() {
                Ok(preset) => preset,
                Err(err) => {
                    warn!(
                        "Could not parse {}: {}. Using {}.",
                        Self::TRAILER_VAR,
                        err,
                        PlannerConfig::DEFAULT_TRAILER
                    );
                    PlannerConfig::DEFAULT_TRAILER
                }
            },
            None => PlannerConfig::DEFAULT_TRAILER,
        };

        let default_max_payload = load_f64_with_warning(
            lookup,
            Self::MAX_PAYLOAD_VAR,
            PlannerConfig::DEFAULT_MAX_PAYLOAD,
            |value| value > 0.0,
            "must be greater than 0",
            "Default payload limit changed",
        );

        let fit_tolerance = load_f64_with_warning(
            lookup,
            Self::FIT_TOLERANCE_VAR,
            PlannerConfig::DEFAULT_FIT_TOLERANCE,
            // Anything near an inch would let visibly oversized pallets through.
            |value| (0.0..=0.1).contains(&value),
            "must be between 0 and 0.1",
            "Adjusted fit tolerance may change layouts",
        );

        let planner = PlannerConfig::builder()
            .default_trailer(default_trailer)
            .default_max_payload(default_max_payload)
            .fit_tolerance(fit_tolerance)
            .build();

        Self { planner }
    }

    /// Returns the configured PlannerConfig.
    pub fn planner_config(&self) -> PlannerConfig {
        self.planner
    }
}

fn process_env(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn env_string(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    let value = lookup(name)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn load_f64_with_warning(
    lookup: &dyn Fn(&str) -> Option<String>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(lookup, var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && validator(value) => {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    info!("{} ({} = {}).", notice, var_name, value);
                }
                value
            }
            Ok(_) => {
                warn!(
                    "{} contains invalid value '{}': {}. Using {}.",
                    var_name, raw, invalid_hint, default
                );
                default
            }
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(&move |name: &str| map.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = config_from(&[]);
        assert_eq!(config.api.port(), 8080);
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.api.uses_default_host());
        assert_eq!(config.planner.planner_config(), PlannerConfig::default());
    }

    #[test]
    fn test_api_host_and_port() {
        let config = config_from(&[
            ("LOAD_PLANNER_API_HOST", " 127.0.0.1 "),
            ("LOAD_PLANNER_API_PORT", "9090"),
        ]);
        assert_eq!(config.api.socket_addr(), "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.api.display_host(), "127.0.0.1");
        assert!(!config.api.binds_to_all_interfaces());
    }

    #[test]
    fn test_invalid_api_values_fall_back() {
        let config = config_from(&[
            ("LOAD_PLANNER_API_HOST", "not-an-ip"),
            ("LOAD_PLANNER_API_PORT", "0"),
        ]);
        assert!(config.api.uses_default_host());
        assert_eq!(config.api.port(), 8080);

        let config = config_from(&[("LOAD_PLANNER_API_PORT", "seventy")]);
        assert_eq!(config.api.port(), 8080);
    }

    #[test]
    fn test_planner_overrides() {
        let config = config_from(&[
            ("LOAD_PLANNER_DEFAULT_TRAILER", "48"),
            ("LOAD_PLANNER_MAX_PAYLOAD", "42000"),
            ("LOAD_PLANNER_FIT_TOLERANCE", "0.001"),
        ]);
        let planner = config.planner.planner_config();
        assert_eq!(planner.default_trailer, TrailerPreset::FortyEightFoot);
        assert_eq!(planner.default_max_payload, 42_000.0);
        assert_eq!(planner.fit_tolerance, 0.001);
    }

    #[test]
    fn test_invalid_planner_values_fall_back() {
        let config = config_from(&[
            ("LOAD_PLANNER_DEFAULT_TRAILER", "40ft"),
            ("LOAD_PLANNER_MAX_PAYLOAD", "-5"),
            ("LOAD_PLANNER_FIT_TOLERANCE", "NaN"),
        ]);
        assert_eq!(config.planner.planner_config(), PlannerConfig::default());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("LOAD_PLANNER_MAX_PAYLOAD", "   ")]);
        assert_eq!(
            config.planner.planner_config().default_max_payload,
            PlannerConfig::DEFAULT_MAX_PAYLOAD
        );
    }
}
