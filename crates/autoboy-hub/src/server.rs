// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hub HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use autoboy_core::{AutoboyError, SessionLookup, TokenValidator};
use axum::{Router, middleware as axum_middleware, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::HubSettings;
use crate::acl::ConversationAcl;
use crate::auth::{AdminAuth, OriginPolicy, admin_middleware};
use crate::handlers;
use crate::hub::Hub;
use crate::ws;

/// State for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Prometheus render function, when the exporter is installed.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct HubState {
    pub hub: Arc<Hub>,
    pub acl: Arc<ConversationAcl>,
    pub tokens: Arc<dyn TokenValidator>,
    /// `None` skips the active-session check.
    pub sessions: Option<Arc<dyn SessionLookup>>,
    pub origins: OriginPolicy,
    pub settings: HubSettings,
    pub admin_user_type: String,
    pub health: HealthState,
}

/// Build the hub's routes:
/// - GET /health, GET /metrics (public)
/// - GET /api/v1/ws/stats (admin bearer token)
/// - GET /api/v1/ws/connect (token in query, checked during the handshake)
pub fn router(state: HubState) -> Router {
    let admin = AdminAuth {
        tokens: state.tokens.clone(),
        admin_user_type: state.admin_user_type.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/v1/ws/stats", get(handlers::get_ws_stats))
        .route_layer(axum_middleware::from_fn_with_state(admin, admin_middleware))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/api/v1/ws/connect", get(ws::ws_connect))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listening socket.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, AutoboyError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| AutoboyError::Internal(format!("failed to bind hub to {addr}: {e}")))
}

/// Serve until `shutdown` is cancelled, then close every live connection.
pub async fn serve(
    listener: TcpListener,
    state: HubState,
    shutdown: CancellationToken,
) -> Result<(), AutoboyError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("hub listening on {addr}");
    }

    let hub = state.hub.clone();
    let app = router(state);
    let closing = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            closing.cancelled().await;
            let closed = hub.close_all();
            tracing::info!(closed, "hub shutting down");
        })
        .await
        .map_err(|e| AutoboyError::Internal(format!("hub server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtValidator, TokenClaims};
    use autoboy_store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"router-test-secret-0123456789";

    fn token(user_type: &str) -> String {
        let claims = TokenClaims {
            user_id: "u1".into(),
            user_type: user_type.into(),
            exp: chrono::Utc::now().timestamp() + 600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn state() -> HubState {
        let store = Arc::new(MemoryStore::new());
        HubState {
            hub: Arc::new(Hub::default()),
            acl: Arc::new(ConversationAcl::new(store, std::time::Duration::from_secs(1))),
            tokens: Arc::new(JwtValidator::new(SECRET)),
            sessions: None,
            origins: OriginPolicy::default(),
            settings: HubSettings::default(),
            admin_user_type: "admin".into(),
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: Some(Arc::new(|| "autoboy_ws_rooms 0\n".to_string())),
            },
        }
    }

    async fn get(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri(uri);
        if let Some(t) = bearer {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_and_metrics_are_public() {
        let app = router(state());
        let (status, body) = get(app.clone(), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""status":"ok""#));

        let (status, body) = get(app, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("autoboy_ws_rooms"));
    }

    #[tokio::test]
    async fn metrics_404_without_exporter() {
        let mut s = state();
        s.health.prometheus_render = None;
        let (status, _) = get(router(s), "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_require_admin_token() {
        let s = state();
        let (client, _rx) = crate::client::Client::new("c1", "u9", 4);
        s.hub.register(client).unwrap();
        s.hub.join_room("c1", "conv-1").unwrap();
        assert!(s.hub.allow_inbound("u9"));
        let app = router(s);

        let (status, _) = get(app.clone(), "/api/v1/ws/stats", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(app.clone(), "/api/v1/ws/stats", Some("garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(app.clone(), "/api/v1/ws/stats", Some(&token("buyer"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = get(app, "/api/v1/ws/stats", Some(&token("admin"))).await;
        assert_eq!(status, StatusCode::OK);
        let stats: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(stats["clients"], 1);
        assert_eq!(stats["rooms"], 1);
        assert_eq!(stats["rate_tracked_users"], 1);
        assert_eq!(stats["connections"][0]["rooms"][0], "conv-1");
    }
}
