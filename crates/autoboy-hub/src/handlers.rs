// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for health, metrics and hub statistics.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::client::ClientInfo;
use crate::server::HubState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub clients: usize,
}

/// Response body for GET /api/v1/ws/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub clients: usize,
    pub rooms: usize,
    /// Users with an open rate-limit window.
    pub rate_tracked_users: usize,
    pub connections: Vec<ClientInfo>,
}

/// GET /health: unauthenticated liveness probe.
pub async fn get_public_health(State(state): State<HubState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        clients: state.hub.client_count(),
    })
}

/// GET /metrics: Prometheus text exposition, 404 when the exporter is off.
pub async fn get_public_metrics(State(state): State<HubState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /api/v1/ws/stats (admin).
pub async fn get_ws_stats(State(state): State<HubState>) -> Json<StatsResponse> {
    let connections = state.hub.clients();
    Json(StatsResponse {
        clients: connections.len(),
        rooms: state.hub.room_count(),
        rate_tracked_users: state.hub.rate_limited_users(),
        connections,
    })
}
