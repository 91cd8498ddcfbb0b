// Router for the replay control API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    cycle_speed, get_session, health_check, logout, resume, set_reader_resolution, set_speed,
    stream_session,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/session", get(get_session))
        .route("/session/stream", get(stream_session))
        .route("/session/speed", post(cycle_speed).put(set_speed))
        .route("/session/readers/:kind", put(set_reader_resolution))
        .route("/session/resume", post(resume))
        .route("/session/logout", post(logout))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::{ReplaySession, SessionHandle, SessionSettings};
    use crate::application::testing::{identity, stream, FakeCheckpointStore, FakeSource};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app() -> (Router, SessionHandle) {
        let (session, _task) = ReplaySession::spawn(
            identity("alice"),
            SessionSettings::default(),
            Arc::new(FakeSource::new(stream(10))),
            Arc::new(FakeCheckpointStore::default()),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let state = Arc::new(AppState {
            session: session.clone(),
        });
        (router(state), session)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_resolution_route() {
        let (app, _session) = app().await;

        let response = send(&app, "PUT", "/session/readers/long_stats", Some(r#"{"resolution": "7d"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["long_stats_resolution"], "7d");
        assert_eq!(body["short_stats_resolution"], "1d");

        let response = send(&app, "PUT", "/session/readers/plot", Some(r#"{"resolution": "1d"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "validation");

        let response = send(&app, "PUT", "/session/readers/heatmap", Some(r#"{"resolution": "1h"}"#)).await;
        assert!(response.status().is_client_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_routes() {
        let (app, _session) = app().await;

        let response = send(&app, "POST", "/session/speed", None).await;
        assert_eq!(json(response).await["interval_ms"], 1000);

        let response = send(&app, "PUT", "/session/speed", Some(r#"{"rate": "fast"}"#)).await;
        let body = json(response).await;
        assert_eq!(body["rate"], "fast");
        assert_eq!(body["rate_symbol"], ">>>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_stream_is_ndjson_until_logout() {
        let (app, session) = app().await;

        let response = send(&app, "GET", "/session/stream", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );

        session.logout().await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.ends_with('\n'));

        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["ended"], true);
        assert_eq!(last["username"], "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_after_logout_are_unavailable() {
        let (app, _session) = app().await;

        let response = send(&app, "POST", "/session/logout", None).await;
        assert_eq!(json(response).await["ended"], true);

        let response = send(&app, "POST", "/session/speed", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["code"], "session_closed");

        let response = send(&app, "GET", "/healthz", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
