// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation membership checks.

use std::sync::Arc;
use std::time::Duration;

use autoboy_core::{AutoboyError, DocumentStore, Filter, within};

const CONVERSATIONS: &str = "conversations";

/// Answers "may this user act in this conversation?" from the
/// `conversations` collection, where each document lists its
/// `participants` by user id.
pub struct ConversationAcl {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl ConversationAcl {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// `Ok(())` when `user_id` participates in `conversation_id`.
    ///
    /// Store failures and timeouts are returned as errors; callers treat any
    /// error as a denial.
    pub async fn authorize(&self, user_id: &str, conversation_id: &str) -> Result<(), AutoboyError> {
        let filter = Filter::id(conversation_id).and(Filter::eq("participants", user_id));
        let found = within(self.timeout, self.store.find_one(CONVERSATIONS, &filter)).await?;
        match found {
            Some(_) => Ok(()),
            None => Err(AutoboyError::AclDenied {
                user_id: user_id.to_string(),
                conversation_id: conversation_id.to_string(),
            }),
        }
    }
}
