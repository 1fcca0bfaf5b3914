//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::app::AppState;
use crate::relay::RelayMode;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    // Browser client bundle, if one is deployed next to the relay
    if let Some(dir) = &state.config.static_dir {
        info!(dir = %dir.display(), "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    if let Some(origins) = &state.config.client_origin {
        let allowed_origins: Vec<header::HeaderValue> = origins
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();

        let cors = CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        router = router.layer(cors);
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    relay_mode: RelayMode,
    connected_peers: usize,
    open_sessions: usize,
    waiting_peer: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        relay_mode: state.hub.mode(),
        connected_peers: state.hub.peer_count(),
        open_sessions: state.hub.session_count(),
        waiting_peer: state.hub.has_waiting(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;

    fn test_state() -> AppState {
        let config = Config::from_lookup(|_| None).unwrap();
        AppState::new(config)
    }

    #[tokio::test]
    async fn test_health_reports_relay_state() {
        let router = build_router(test_state());

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["relay_mode"], "paired");
        assert_eq!(json["connected_peers"], 0);
        assert_eq!(json["open_sessions"], 0);
        assert_eq!(json["waiting_peer"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_without_static_dir() {
        let router = build_router(test_state());

        let response = router
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let router = build_router(test_state());

        let response = router
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
