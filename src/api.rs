//! REST API for the load planner.
//!
//! Exposes the planner, the utilization report and order linking as JSON
//! endpoints. Uses Axum as the web framework and supports CORS. The service is
//! stateless: every request carries the complete pallet registry.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PlannerSettings};
use crate::links::{LinkOutcome, LinkRejection, OrderRef, PalletRegistry, apply_link_toggle};
use crate::model::{
    Orientation, PalletType, PalletTypeId, PlacedUnit, TrailerPreset, TrailerProfile,
    ValidationError,
};
use crate::planner::{
    PackEvent, PlacementResult, PlannerConfig, RowSummary, pack_pallets_with_config,
    pack_pallets_with_progress,
};
use crate::report::{LoadReport, LoadStatus, TypeBreakdown, WeightBand, summarize};

#[derive(Clone)]
struct ApiState {
    planner_config: PlannerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>trailer-load-planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Trailer description of a plan request.
///
/// Either a named preset or explicit interior dimensions. A missing payload
/// limit falls back to the configured default.
#[derive(Deserialize, Clone, Debug, ToSchema)]
#[serde(untagged)]
pub enum TrailerRequest {
    Preset {
        preset: TrailerPreset,
        #[serde(default)]
        max_payload_weight: Option<f64>,
    },
    Custom {
        interior_length: f64,
        interior_width: f64,
        #[serde(default)]
        max_payload_weight: Option<f64>,
    },
}

impl TrailerRequest {
    fn into_profile(self, config: &PlannerConfig) -> TrailerProfile {
        match self {
            TrailerRequest::Preset {
                preset,
                max_payload_weight,
            } => preset.profile(max_payload_weight.unwrap_or(config.default_max_payload)),
            TrailerRequest::Custom {
                interior_length,
                interior_width,
                max_payload_weight,
            } => TrailerProfile::new(
                interior_length,
                interior_width,
                max_payload_weight.unwrap_or(config.default_max_payload),
            ),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "trailer": { "preset": "53ft", "max_payload_weight": 45000.0 },
        "pallet_types": [
            {
                "id": "pt-1",
                "label": "Acme",
                "footprint_width": 48.0,
                "footprint_length": 40.0,
                "quantity": 20,
                "weight_each": 1000.0,
                "orientation": "auto",
                "double_stack": false
            }
        ]
    })
)]
pub struct PlanRequest {
    #[serde(default)]
    pub trailer: Option<TrailerRequest>,
    pub pallet_types: Vec<PalletType>,
}

#[derive(Debug)]
struct ValidatedPlanRequest {
    trailer: TrailerProfile,
    registry: PalletRegistry,
}

impl ValidatedPlanRequest {
    fn pallet_type_count(&self) -> usize {
        self.registry.len()
    }

    fn into_parts(self) -> (TrailerProfile, PalletRegistry) {
        (self.trailer, self.registry)
    }
}

#[derive(Debug, Error)]
enum RequestError {
    #[error("{0}")]
    InvalidTrailer(ValidationError),
    #[error("{0}")]
    InvalidPalletTypes(ValidationError),
}

impl PlanRequest {
    fn into_validated(self, config: &PlannerConfig) -> Result<ValidatedPlanRequest, RequestError> {
        let trailer = match self.trailer {
            Some(request) => request.into_profile(config),
            None => config.default_profile(),
        };
        trailer.validate().map_err(RequestError::InvalidTrailer)?;

        let registry = PalletRegistry::from_types(self.pallet_types);
        registry
            .validate()
            .map_err(RequestError::InvalidPalletTypes)?;

        Ok(ValidatedPlanRequest { trailer, registry })
    }
}

/// Response with the planned layout and its report.
#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub trailer: TrailerProfile,
    pub placed: Vec<PlacedUnit>,
    pub overflow_count: usize,
    pub rows: Vec<RowSummary>,
    pub report: LoadReport,
}

impl PlanResponse {
    pub fn from_placement(
        trailer: TrailerProfile,
        result: PlacementResult,
        report: LoadReport,
    ) -> Self {
        let PlacementResult {
            placed,
            overflow_count,
            rows,
        } = result;

        Self {
            trailer,
            placed,
            overflow_count,
            rows,
            report,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "pallet_types": [
            {
                "id": "pt-1",
                "label": "Pallet 1",
                "footprint_width": 48.0,
                "footprint_length": 40.0,
                "quantity": 1,
                "weight_each": 1000.0
            }
        ],
        "type_id": "pt-1",
        "order": {
            "order_key": "IF-1042||PN-77",
            "customer_label": "Acme Fabrication",
            "package_count_hint": 6.0
        }
    })
)]
pub struct LinkToggleRequest {
    pub pallet_types: Vec<PalletType>,
    pub type_id: PalletTypeId,
    pub order: OrderRef,
}

#[derive(Serialize, ToSchema)]
pub struct LinkToggleResponse {
    pub pallet_types: Vec<PalletType>,
    pub outcome: LinkOutcome,
}

/// A trailer preset with its interior dimensions.
#[derive(Serialize, ToSchema)]
pub struct TrailerPresetInfo {
    pub preset: TrailerPreset,
    pub interior_length: f64,
    pub interior_width: f64,
}

impl From<TrailerPreset> for TrailerPresetInfo {
    fn from(preset: TrailerPreset) -> Self {
        Self {
            preset,
            interior_length: preset.interior_length(),
            interior_width: preset.interior_width(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn trailer_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid trailer configuration",
        details,
    )
}

fn parse_plan_request(
    payload: Result<Json<PlanRequest>, JsonRejection>,
    config: &PlannerConfig,
) -> Result<ValidatedPlanRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(config) {
        Ok(validated) => Ok(validated),
        Err(err @ RequestError::InvalidTrailer(_)) => Err(trailer_config_error(err.to_string())),
        Err(err @ RequestError::InvalidPalletTypes(_)) => Err(validation_error(err.to_string())),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_plan, handle_plan_stream, handle_link_toggle, list_trailers),
    components(
        schemas(
            PlanRequest,
            TrailerRequest,
            PlanResponse,
            LinkToggleRequest,
            LinkToggleResponse,
            TrailerPresetInfo,
            ErrorResponse,
            TrailerPreset,
            TrailerProfile,
            PalletType,
            PalletTypeId,
            Orientation,
            PlacedUnit,
            RowSummary,
            PackEvent,
            LoadReport,
            LoadStatus,
            WeightBand,
            TypeBreakdown,
            OrderRef,
            LinkOutcome,
            LinkRejection
        )
    ),
    tags(
        (name = "planning", description = "Trailer load planning"),
        (name = "links", description = "Order to pallet type linking")
    )
)]
struct ApiDoc;

/// Builds the router with all endpoints.
pub fn router(settings: PlannerSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        planner_config: settings.planner_config(),
    };

    Router::new()
        // API endpoints
        .route("/plan", post(handle_plan))
        .route("/plan_stream", post(handle_plan_stream))
        .route("/links/toggle", post(handle_link_toggle))
        .route("/trailers", get(list_trailers))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, settings: PlannerSettings) -> std::io::Result<()> {
    let app = router(settings);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API endpoints: POST /plan, POST /plan_stream, POST /links/toggle, GET /trailers");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /plan endpoint.
///
/// Lays out the pallet types on the trailer floor and reports utilization.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Planned trailer load", body = PlanResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or trailer configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_plan_request(payload, &state.planner_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "📥 New plan request: {} pallet types",
        request.pallet_type_count()
    );
    let (trailer, registry) = request.into_parts();
    let result = pack_pallets_with_config(registry.types(), &trailer, state.planner_config);
    let report = summarize(registry.types(), &trailer, &result);
    info!(
        placed = result.placed_count(),
        overflow = result.overflow_count,
        status = report.load_status.code(),
        "📦 Plan finished"
    );

    let response = PlanResponse::from_placement(trailer, result, report);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /plan_stream endpoint (SSE).
///
/// Streams planner events as Server-Sent Events, followed by a final
/// `Report` event carrying the load report.
#[utoipa::path(
    post,
    path = "/plan_stream",
    request_body = PlanRequest,
    responses(
        (
            status = 200,
            description = "Streams planner events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or trailer configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_plan_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_plan_request(payload, &state.planner_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "📥 New plan stream request: {} pallet types",
        request.pallet_type_count()
    );
    let (trailer, registry) = request.into_parts();
    let config = state.planner_config;
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let result = pack_pallets_with_progress(registry.types(), &trailer, config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away; remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });
        let report = summarize(registry.types(), &trailer, &result);
        info!(
            placed = result.placed_count(),
            overflow = result.overflow_count,
            status = report.load_status.code(),
            "📦 Plan stream finished"
        );
        match serde_json::to_string(&json!({ "type": "Report", "report": report })) {
            Ok(json) => {
                let _ = tx.blocking_send(json);
            }
            Err(err) => debug!("Could not serialize load report: {}", err),
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /links/toggle endpoint.
///
/// Attaches or detaches an order on a pallet type and returns the new registry.
/// A rejected toggle returns the registry unchanged.
#[utoipa::path(
    post,
    path = "/links/toggle",
    request_body = LinkToggleRequest,
    responses(
        (status = 200, description = "Updated pallet types", body = LinkToggleResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid pallet types",
            body = ErrorResponse
        )
    ),
    tag = "links"
)]
async fn handle_link_toggle(payload: Result<Json<LinkToggleRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let registry = PalletRegistry::from_types(request.pallet_types);
    if let Err(err) = registry.validate() {
        return validation_error(err.to_string());
    }

    let (next, outcome) = apply_link_toggle(&registry, &request.type_id, &request.order);
    info!(
        type_id = %request.type_id,
        order = %request.order.order_key,
        rejected = outcome.is_rejected(),
        "🔗 Link toggled"
    );

    let response = LinkToggleResponse {
        pallet_types: next.into_types(),
        outcome,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for GET /trailers endpoint.
#[utoipa::path(
    get,
    path = "/trailers",
    responses(
        (status = 200, description = "Available trailer presets", body = [TrailerPresetInfo])
    ),
    tag = "planning"
)]
async fn list_trailers() -> Json<Vec<TrailerPresetInfo>> {
    Json(TrailerPreset::ALL.into_iter().map(TrailerPresetInfo::from).collect())
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderKey;

    fn test_state() -> ApiState {
        ApiState {
            planner_config: PlannerConfig::default(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Body should be readable");
        serde_json::from_slice(&bytes).expect("Body should be JSON")
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/plan", "/plan_stream", "/links/toggle", "/trailers"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PlanRequest", "PlanResponse", "LoadReport", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn plan_request_parses_preset_trailer() {
        let json = r#"{
            "trailer": {"preset": "48ft"},
            "pallet_types": []
        }"#;
        let request: PlanRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        let validated = request
            .into_validated(&PlannerConfig::default())
            .expect("Should validate successfully");
        assert_eq!(validated.trailer.interior_length, 576.0);
        assert_eq!(
            validated.trailer.max_payload_weight,
            PlannerConfig::DEFAULT_MAX_PAYLOAD,
            "Missing payload limit should fall back to the configured default"
        );
    }

    #[test]
    fn plan_request_parses_custom_trailer() {
        let json = r#"{
            "trailer": {
                "interior_length": 300.0,
                "interior_width": 96.0,
                "max_payload_weight": 20000.0
            },
            "pallet_types": []
        }"#;
        let request: PlanRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(matches!(
            request.trailer,
            Some(TrailerRequest::Custom {
                max_payload_weight: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn plan_request_without_trailer_uses_configured_default() {
        let json = r#"{"pallet_types": []}"#;
        let request: PlanRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        let config = PlannerConfig::builder()
            .default_trailer(TrailerPreset::FortyEightFoot)
            .default_max_payload(40_000.0)
            .build();
        let validated = request
            .into_validated(&config)
            .expect("Should validate successfully");
        assert_eq!(validated.trailer, TrailerPreset::FortyEightFoot.profile(40_000.0));
    }

    #[test]
    fn plan_request_rejects_duplicate_ids() {
        let request = PlanRequest {
            trailer: None,
            pallet_types: vec![
                PalletType::new("pt-1", "A", 48.0, 40.0),
                PalletType::new("pt-1", "B", 48.0, 40.0),
            ],
        };
        let err = request
            .into_validated(&PlannerConfig::default())
            .expect_err("Duplicate ids must be rejected");
        assert!(matches!(
            err,
            RequestError::InvalidPalletTypes(ValidationError::DuplicateId(_))
        ));
    }

    #[test]
    fn plan_request_rejects_non_finite_trailer() {
        let request = PlanRequest {
            trailer: Some(TrailerRequest::Custom {
                interior_length: f64::INFINITY,
                interior_width: 98.5,
                max_payload_weight: None,
            }),
            pallet_types: Vec::new(),
        };
        assert!(matches!(
            request.into_validated(&PlannerConfig::default()),
            Err(RequestError::InvalidTrailer(_))
        ));
    }

    #[tokio::test]
    async fn plan_handler_returns_layout_and_report() {
        let request = PlanRequest {
            trailer: Some(TrailerRequest::Preset {
                preset: TrailerPreset::FiftyThreeFoot,
                max_payload_weight: Some(45_000.0),
            }),
            pallet_types: vec![
                PalletType::new("pt-1", "Acme", 48.0, 40.0)
                    .with_quantity(20)
                    .with_weight_each(1000.0),
            ],
        };

        let response = handle_plan(State(test_state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["overflow_count"], 0);
        assert_eq!(body["placed"].as_array().map(Vec::len), Some(20));
        assert_eq!(body["report"]["total_weight"], 20000.0);
        assert_eq!(body["report"]["load_status"], "ok");
    }

    #[tokio::test]
    async fn link_toggle_handler_attaches_order() {
        let request = LinkToggleRequest {
            pallet_types: vec![PalletType::default_at(0, PalletTypeId::new("pt-1"))],
            type_id: PalletTypeId::new("pt-1"),
            order: OrderRef::new(OrderKey::from_parts("IF-1", "PN-1"), "Acme", 3.0),
        };

        let response = handle_link_toggle(Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["outcome"]["action"], "attached");
        assert_eq!(body["pallet_types"][0]["quantity"], 3);
        assert_eq!(body["pallet_types"][0]["linked_order_keys"][0], "IF-1||PN-1");
    }

    #[tokio::test]
    async fn link_toggle_handler_rejects_double_linked_registry() {
        let key = OrderKey::new("o1");
        let request = LinkToggleRequest {
            pallet_types: vec![
                PalletType::new("pt-1", "A", 48.0, 40.0).with_linked_order(key.clone()),
                PalletType::new("pt-2", "B", 48.0, 40.0).with_linked_order(key.clone()),
            ],
            type_id: PalletTypeId::new("pt-1"),
            order: OrderRef::new(key, "", 1.0),
        };

        let response = handle_link_toggle(Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
