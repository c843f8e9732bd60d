// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators consulted during the WebSocket upgrade handshake.

use async_trait::async_trait;

use crate::error::AutoboyError;
use crate::types::Claims;

/// Validates an access token. No side effects.
pub trait TokenValidator: Send + Sync + 'static {
    fn validate(&self, token: &str) -> Result<Claims, AutoboyError>;
}

/// Reports whether a user's session for a token is still live.
///
/// Implementations deny on lookup failure.
#[async_trait]
pub trait SessionLookup: Send + Sync + 'static {
    async fn is_active(&self, user_id: &str, token: &str) -> bool;
}
