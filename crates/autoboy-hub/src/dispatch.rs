// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing of client-originated frames.
//!
//! Every drop here is silent to the peer and logged at debug.

use std::sync::Arc;

use autoboy_core::{Message, MessageType};
use autoboy_prometheus::recording;
use chrono::Utc;
use tracing::debug;

use crate::acl::ConversationAcl;
use crate::hub::Hub;

/// Room carrying a conversation's traffic.
pub fn room_for(conversation_id: &str) -> String {
    format!("conversation_{conversation_id}")
}

/// The identity and collaborators of one live connection.
pub(crate) struct Connection {
    pub(crate) hub: Arc<Hub>,
    pub(crate) acl: Arc<ConversationAcl>,
    pub(crate) client_id: String,
    pub(crate) user_id: String,
}

impl Connection {
    pub(crate) async fn handle_text(&self, text: &str) {
        if !self.hub.allow_inbound(&self.user_id) {
            debug!(user_id = %self.user_id, "inbound frame rate limited");
            recording::record_dropped("rate_limited");
            return;
        }

        let mut message: Message = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                debug!(client_id = %self.client_id, "invalid frame: {e}");
                recording::record_dropped("invalid_frame");
                return;
            }
        };
        recording::record_ws_message("inbound", &message.kind.to_string());

        match message.kind {
            MessageType::JoinConversation => {
                let Some(conversation) = self.conversation_of(&message) else {
                    return;
                };
                if self.authorized(&conversation).await
                    && let Err(e) = self.hub.join_room(&self.client_id, &room_for(&conversation))
                {
                    debug!("join failed: {e}");
                }
            }
            MessageType::LeaveConversation => {
                let Some(conversation) = self.conversation_of(&message) else {
                    return;
                };
                if let Err(e) = self.hub.leave_room(&self.client_id, &room_for(&conversation)) {
                    debug!("leave failed: {e}");
                }
            }
            MessageType::ChatMessage | MessageType::TypingStart | MessageType::TypingStop => {
                let Some(conversation) = self.conversation_of(&message) else {
                    return;
                };
                if !self.authorized(&conversation).await {
                    return;
                }
                message.user_id = Some(self.user_id.clone());
                message.timestamp = Utc::now();
                self.hub.broadcast_to_room_except(
                    &room_for(&conversation),
                    message,
                    Some(&self.client_id),
                );
            }
            other => {
                debug!(kind = %other, client_id = %self.client_id, "dropping unsupported frame");
                recording::record_dropped("invalid_frame");
            }
        }
    }

    fn conversation_of(&self, message: &Message) -> Option<String> {
        let id = message.conversation_id();
        if id.is_none() {
            debug!(kind = %message.kind, client_id = %self.client_id, "frame without conversation_id");
            recording::record_dropped("invalid_frame");
        }
        id
    }

    async fn authorized(&self, conversation: &str) -> bool {
        match self.acl.authorize(&self.user_id, conversation).await {
            Ok(()) => true,
            Err(e) => {
                debug!("dropping frame: {e}");
                recording::record_dropped("acl_denied");
                false
            }
        }
    }
}
