// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time messaging hub for the AutoBoy backend.
//!
//! Owns every live WebSocket connection: conversation rooms, per-user
//! inboxes, bounded outboxes with slow-consumer eviction, inbound rate
//! limiting and conversation ACLs. The alert engine pushes to users through
//! the [`UserPush`](autoboy_core::UserPush) implementation on [`Hub`].

pub mod acl;
pub mod auth;
pub mod client;
pub mod dispatch;
pub mod handlers;
pub mod hub;
pub mod ratelimit;
pub mod server;
pub mod ws;

use std::time::Duration;

use autoboy_config::HubConfig;

pub use acl::ConversationAcl;
pub use auth::{AdminAuth, JwtValidator, OriginPolicy, StoreSessionLookup, TokenClaims, hash_token};
pub use client::{Client, ClientInfo, OutboxReceiver};
pub use dispatch::room_for;
pub use hub::Hub;
pub use ratelimit::RateLimiter;
pub use server::{HealthState, HubState, bind, router, serve};

/// Connection tunables, resolved from `[hub]` configuration.
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub read_deadline: Duration,
    pub write_deadline: Duration,
    pub ping_interval: Duration,
    pub outbox_capacity: usize,
    pub inbound_rate_per_second: u32,
    pub max_message_bytes: usize,
    pub acl_timeout: Duration,
}

impl HubSettings {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            read_deadline: config.read_deadline(),
            write_deadline: config.write_deadline(),
            ping_interval: config.ping_interval(),
            outbox_capacity: config.outbox_capacity,
            inbound_rate_per_second: config.inbound_rate_per_user_per_second,
            max_message_bytes: config.max_message_bytes,
            acl_timeout: config.acl_timeout(),
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}
