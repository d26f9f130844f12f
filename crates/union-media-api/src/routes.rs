use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderMap, HeaderValue};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use union_media_core::types::DeleteAck;
use union_media_core::{ActionEnvelope, MediaAction, UploadResult};

use crate::auth::{AuthenticatedUser, SupabaseSessionVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::media::MediaHostClient;

const CORS_ALLOW_HEADERS: &str =
    "authorization, x-client-info, apikey, content-type, content-disposition";
const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    session_verifier: Arc<SupabaseSessionVerifier>,
    media_host: Option<Arc<MediaHostClient>>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            session_verifier: Arc::new(SupabaseSessionVerifier::new(config.clone())),
            media_host: MediaHostClient::from_config(&config).map(Arc::new),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(dispatch).options(preflight))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .layer(middleware::map_response(apply_cors_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn set_cors_headers(headers: &mut HeaderMap) {
    for (name, value) in [
        (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ),
        (
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ),
    ] {
        headers.insert(name, value);
    }
}

async fn apply_cors_headers(mut response: Response) -> Response {
    set_cors_headers(response.headers_mut());
    response
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    media_configured: bool,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        media_configured: state.media_host.is_some(),
    })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        state.session_verifier.authorize(&parts.headers).await
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DispatchResponse {
    Uploaded(UploadResult),
    Deleted(DeleteAck),
}

async fn dispatch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DispatchResponse>, AppError> {
    let body = body?;
    let envelope: ActionEnvelope = serde_json::from_slice(&body)
        .map_err(|error| AppError::invalid_request(format!("Invalid request body: {error}")))?;
    let action = MediaAction::try_from(envelope)?;

    let media_host = state
        .media_host
        .as_ref()
        .ok_or_else(|| AppError::config("Media host credentials are not configured"))?;

    let user_hash = user_fingerprint(&user.user_id);
    match action {
        MediaAction::Upload {
            base64_data,
            folder,
        } => {
            let result = media_host.upload(&base64_data, &folder).await?;
            tracing::info!(
                action = "upload",
                user = user_hash,
                folder = %folder,
                payload_len = base64_data.len(),
                "Uploaded media resource"
            );
            Ok(Json(DispatchResponse::Uploaded(result)))
        }
        MediaAction::Delete { public_id } => {
            let outcome = media_host.destroy(&public_id).await?;
            tracing::info!(
                action = "delete",
                user = user_hash,
                public_id_len = public_id.len(),
                outcome = outcome.label(),
                "Deleted media resource"
            );
            Ok(Json(DispatchResponse::Deleted(DeleteAck { success: true })))
        }
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(detail, "Request handler panicked");
    let mut response =
        AppError::internal("Unexpected failure while handling request").into_response();
    set_cors_headers(response.headers_mut());
    response
}

fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}
