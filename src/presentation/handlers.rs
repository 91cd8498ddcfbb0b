// HTTP request handlers - operator controls for the replay session
use crate::application::error::ReplayError;
use crate::application::session::SessionSnapshot;
use crate::application::window_reader::ReaderKind;
use crate::domain::playback::PlaybackRate;
use crate::domain::resolution::Resolution;
use crate::infrastructure::chunked_json::stream_from_watch;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SpeedRequest {
    pub rate: PlaybackRate,
}

#[derive(Deserialize)]
pub struct ResolutionRequest {
    pub resolution: Resolution,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Maps session errors onto HTTP status codes
pub struct ApiError(ReplayError);

impl From<ReplayError> for ApiError {
    fn from(err: ReplayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self.0 {
            ReplayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            ReplayError::SessionClosed => (StatusCode::SERVICE_UNAVAILABLE, "session_closed"),
            ReplayError::NoData(_) => (StatusCode::NOT_FOUND, "no_data"),
            ReplayError::Fetch(_)
            | ReplayError::CheckpointRead(_)
            | ReplayError::CheckpointWrite(_) => (StatusCode::BAD_GATEWAY, "upstream"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        tracing::debug!("Request failed: {}", self.0);
        let body = ErrorBody {
            code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<SessionSnapshot>, ApiError>;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// Current snapshot, then one line per change until the session ends
pub async fn stream_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_watch(state.session.subscribe(), |snapshot: &SessionSnapshot| {
        snapshot.ended
    })
}

/// Cycle slow -> normal -> fast -> slow
pub async fn cycle_speed(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(state.session.cycle_rate().await?))
}

pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeedRequest>,
) -> ApiResult {
    Ok(Json(state.session.set_rate(request.rate).await?))
}

pub async fn set_reader_resolution(
    Path(kind): Path<ReaderKind>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResolutionRequest>,
) -> ApiResult {
    Ok(Json(state.session.set_resolution(kind, request.resolution).await?))
}

pub async fn resume(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(state.session.resume().await?))
}

pub async fn logout(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(state.session.logout().await?))
}
