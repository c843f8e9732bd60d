// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table-driven auth collaborators for handshake tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use autoboy_core::{AutoboyError, Claims, SessionLookup, TokenValidator};
use chrono::{Duration, Utc};

/// Accepts exactly the tokens it was given, each mapped to a user.
#[derive(Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, (String, String)>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: &str, user_type: &str) -> Self {
        self.tokens
            .insert(token.into(), (user_id.into(), user_type.into()));
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Result<Claims, AutoboyError> {
        let (user_id, user_type) = self
            .tokens
            .get(token)
            .ok_or_else(|| AutoboyError::Unauthorized("unknown token".into()))?;
        Ok(Claims {
            user_id: user_id.clone(),
            user_type: user_type.clone(),
            expires_at: Utc::now() + Duration::minutes(10),
        })
    }
}

/// Session table keyed by `(user_id, token)`; sessions can be revoked.
#[derive(Default)]
pub struct StaticSessions {
    active: Mutex<HashSet<(String, String)>>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, user_id: &str, token: &str) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user_id.into(), token.into()));
    }

    pub fn revoke(&self, user_id: &str, token: &str) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(user_id.to_string(), token.to_string()));
    }
}

#[async_trait]
impl SessionLookup for StaticSessions {
    async fn is_active(&self, user_id: &str, token: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(user_id.to_string(), token.to_string()))
    }
}
