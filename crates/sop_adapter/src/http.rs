#![forbid(unsafe_code)]

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use sop_kernel_contracts::sop::{SopDraft, SopRecord};
use sop_kernel_contracts::sopgen::{SopGenMode, SopGenerateRequest, SopGenerateResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::{
    app_ui_assets, AdapterError, AdapterHealthResponse, AdapterRuntime, DeleteResponse,
    ErrorResponse, DELETE_OK_MESSAGE, LIVENESS_TEXT,
};

pub const DATABASE_ERROR: &str = "Database error";
pub const SOP_NOT_FOUND: &str = "SOP not found";
pub const AI_NOT_CONNECTED: &str = "AI not connected";
pub const AI_UNAVAILABLE: &str = "AI unavailable";

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn build_router(runtime: AdapterRuntime) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/healthz", get(healthz))
        .route("/sop", get(list_sops).post(create_sop))
        .route("/sop/:id", put(update_sop).delete(delete_sop))
        .route("/ai/sop", post(generate_sop))
        .route("/app", get(app_html))
        .route("/app/app.css", get(app_css))
        .route("/app/app.js", get(app_js))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}

/// Open policy: there is no auth model to protect.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn store_fault(route: &'static str, err: AdapterError) -> ApiError {
    error!(route, error = %err, "sop store request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, DATABASE_ERROR)
}

fn body_fault(route: &'static str, rejection: JsonRejection, message: &str) -> ApiError {
    error!(route, error = %rejection.body_text(), "rejected request body");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

pub async fn healthz(
    State(runtime): State<AdapterRuntime>,
) -> Result<Json<AdapterHealthResponse>, ApiError> {
    runtime
        .health_report()
        .map(Json)
        .map_err(|err| store_fault("GET /healthz", err))
}

pub async fn list_sops(
    State(runtime): State<AdapterRuntime>,
) -> Result<Json<Vec<SopRecord>>, ApiError> {
    runtime
        .list_sops()
        .map(Json)
        .map_err(|err| store_fault("GET /sop", err))
}

pub async fn create_sop(
    State(runtime): State<AdapterRuntime>,
    body: Result<Json<SopDraft>, JsonRejection>,
) -> Result<Json<SopRecord>, ApiError> {
    let Json(draft) = body.map_err(|r| body_fault("POST /sop", r, DATABASE_ERROR))?;
    runtime
        .create_sop(draft)
        .map(Json)
        .map_err(|err| store_fault("POST /sop", err))
}

pub async fn update_sop(
    State(runtime): State<AdapterRuntime>,
    Path(id): Path<String>,
    body: Result<Json<SopDraft>, JsonRejection>,
) -> Result<Json<SopRecord>, ApiError> {
    let Json(draft) = body.map_err(|r| body_fault("PUT /sop/:id", r, DATABASE_ERROR))?;
    match runtime.update_sop(&id, draft) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, SOP_NOT_FOUND)),
        Err(err) => Err(store_fault("PUT /sop/:id", err)),
    }
}

pub async fn delete_sop(
    State(runtime): State<AdapterRuntime>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match runtime.delete_sop(&id) {
        Ok(Some(_)) => Ok(Json(DeleteResponse {
            message: DELETE_OK_MESSAGE.to_string(),
        })),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, SOP_NOT_FOUND)),
        Err(err) => Err(store_fault("DELETE /sop/:id", err)),
    }
}

pub async fn generate_sop(
    State(runtime): State<AdapterRuntime>,
    body: Result<Json<SopGenerateRequest>, JsonRejection>,
) -> Result<Json<SopGenerateResponse>, ApiError> {
    let Json(request) = body.map_err(|r| body_fault("POST /ai/sop", r, AI_UNAVAILABLE))?;
    if runtime.ai_mode() == SopGenMode::Disabled {
        warn!("ai route called while text generator is disabled");
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, AI_NOT_CONNECTED));
    }
    let joined = tokio::task::spawn_blocking(move || runtime.generate_sop(&request.text)).await;
    match joined {
        Ok(Ok(sop)) => Ok(Json(SopGenerateResponse { sop })),
        Ok(Err(AdapterError::AiNotConnected)) => {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, AI_NOT_CONNECTED))
        }
        Ok(Err(err)) => {
            error!(error = %err, "sop generation failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, AI_UNAVAILABLE))
        }
        Err(join_err) => {
            error!(error = %join_err, "sop generation task failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, AI_UNAVAILABLE))
        }
    }
}

pub async fn app_html() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        app_ui_assets::APP_HTML,
    )
}

pub async fn app_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        app_ui_assets::APP_CSS,
    )
}

pub async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        app_ui_assets::APP_JS,
    )
}
