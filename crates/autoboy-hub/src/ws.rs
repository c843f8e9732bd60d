// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint.
//!
//! Each accepted connection runs two cooperative tasks:
//! 1. Writer: drains the client outbox onto the socket and sends pings.
//! 2. Reader: enforces the read deadline and routes inbound frames.
//!
//! Both own a [`Teardown`] guard. Whichever task ends first (normally or
//! by panic) unregisters the client and cancels the other.

use std::sync::Arc;

use autoboy_core::ids::new_client_id;
use autoboy_core::{AutoboyError, Claims};
use autoboy_prometheus::recording;
use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::HubSettings;
use crate::client::{Client, OutboxReceiver};
use crate::dispatch::Connection;
use crate::hub::Hub;
use crate::server::HubState;

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Upgrade handler for `GET /api/v1/ws/connect?token=...`.
pub async fn ws_connect(
    ws: WebSocketUpgrade,
    State(state): State<HubState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Response {
    let claims = match authenticate(&state, params.token.as_deref()).await {
        Ok(claims) => claims,
        Err(e) => {
            debug!("upgrade refused: {e}");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.origins.allows(origin) {
        debug!(origin, user_id = %claims.user_id, "upgrade refused: origin not allowed");
        return StatusCode::FORBIDDEN.into_response();
    }

    let limit = state.settings.max_message_bytes;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, state, claims.user_id))
}

async fn authenticate(state: &HubState, token: Option<&str>) -> Result<Claims, AutoboyError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AutoboyError::Unauthorized("missing token".into()))?;
    let claims = state.tokens.validate(token)?;
    if let Some(sessions) = &state.sessions
        && !sessions.is_active(&claims.user_id, token).await
    {
        return Err(AutoboyError::Unauthorized("session is not active".into()));
    }
    Ok(claims)
}

/// Unregisters the client and cancels the sibling task when dropped.
struct Teardown {
    hub: Arc<Hub>,
    client_id: String,
    cancel: CancellationToken,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.hub.unregister(&self.client_id) {
            info!(client_id = %self.client_id, "websocket disconnected");
        }
        self.cancel.cancel();
    }
}

async fn handle_socket(socket: WebSocket, state: HubState, user_id: String) {
    let client_id = new_client_id();
    let (client, outbox) = Client::new(
        client_id.clone(),
        user_id.clone(),
        state.settings.outbox_capacity,
    );
    let cancel = client.cancellation();
    if let Err(e) = state.hub.register(client) {
        warn!("failed to register websocket client: {e}");
        return;
    }
    info!(client_id = %client_id, user_id = %user_id, "websocket connected");

    let guard = |cancel: &CancellationToken| Teardown {
        hub: state.hub.clone(),
        client_id: client_id.clone(),
        cancel: cancel.clone(),
    };
    let (sink, stream) = socket.split();

    let writer = tokio::spawn(write_loop(
        sink,
        outbox,
        state.settings.clone(),
        guard(&cancel),
    ));

    let conn = Connection {
        hub: state.hub.clone(),
        acl: state.acl.clone(),
        client_id: client_id.clone(),
        user_id,
    };
    read_loop(stream, &conn, state.settings.read_deadline, guard(&cancel)).await;

    if let Err(e) = writer.await {
        warn!(client_id = %client_id, "websocket writer task failed: {e}");
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut outbox: OutboxReceiver,
    settings: HubSettings,
    guard: Teardown,
) {
    let mut ping = tokio::time::interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            _ = guard.cancel.cancelled() => break,
            next = outbox.recv() => match next {
                Some(message) => match serde_json::to_string(&*message) {
                    Ok(text) => {
                        recording::record_ws_message("outbound", &message.kind.to_string());
                        WsMessage::Text(text.into())
                    }
                    Err(e) => {
                        warn!(client_id = %guard.client_id, "failed to encode frame: {e}");
                        continue;
                    }
                },
                // Unregistered: evicted as a slow consumer, or shutting down.
                None => WsMessage::Close(None),
            },
            _ = ping.tick() => WsMessage::Ping(Bytes::new()),
        };

        let closing = matches!(frame, WsMessage::Close(_));
        match timeout(settings.write_deadline, sink.send(frame)).await {
            Ok(Ok(())) if !closing => {}
            Ok(Ok(())) => break,
            Ok(Err(e)) => {
                debug!(client_id = %guard.client_id, "socket write failed: {e}");
                break;
            }
            Err(_) => {
                debug!(client_id = %guard.client_id, "write deadline exceeded");
                break;
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    conn: &Connection,
    read_deadline: std::time::Duration,
    guard: Teardown,
) {
    let mut deadline = Instant::now() + read_deadline;
    loop {
        let next = tokio::select! {
            _ = guard.cancel.cancelled() => break,
            next = timeout_at(deadline, stream.next()) => next,
        };
        let frame = match next {
            Err(_) => {
                debug!(client_id = %conn.client_id, "read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(client_id = %conn.client_id, "socket read failed: {e}");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            WsMessage::Text(text) => conn.handle_text(text.as_str()).await,
            WsMessage::Pong(_) => {
                deadline = Instant::now() + read_deadline;
                conn.hub.record_pong(&conn.client_id);
            }
            WsMessage::Close(_) => break,
            WsMessage::Binary(_) => {
                debug!(client_id = %conn.client_id, "binary frames are not supported");
                recording::record_dropped("invalid_frame");
            }
            // Answered by the protocol layer.
            WsMessage::Ping(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_params_token_is_optional() {
        let p: ConnectParams = serde_json::from_str("{}").unwrap();
        assert!(p.token.is_none());
        let p: ConnectParams = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(p.token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn teardown_unregisters_and_cancels() {
        let hub = Arc::new(Hub::default());
        let (client, _rx) = Client::new("c1", "u1", 4);
        hub.register(client).unwrap();
        let cancel = CancellationToken::new();

        let first = Teardown {
            hub: hub.clone(),
            client_id: "c1".into(),
            cancel: cancel.clone(),
        };
        let second = Teardown {
            hub: hub.clone(),
            client_id: "c1".into(),
            cancel: cancel.clone(),
        };
        drop(first);
        assert!(cancel.is_cancelled());
        assert!(!hub.is_registered("c1"));
        drop(second);
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn teardown_runs_when_a_task_panics() {
        let hub = Arc::new(Hub::default());
        let (client, _rx) = Client::new("c1", "u1", 4);
        hub.register(client).unwrap();
        let cancel = CancellationToken::new();
        let guard = Teardown {
            hub: hub.clone(),
            client_id: "c1".into(),
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("boom");
        });
        assert!(task.await.is_err());
        assert!(cancel.is_cancelled());
        assert!(!hub.is_registered("c1"));
    }
}
