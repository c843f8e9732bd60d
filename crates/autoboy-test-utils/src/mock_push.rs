// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Arc, Mutex, PoisonError};

use autoboy_core::{Message, UserPush};

/// Records every `send_to_user` call, then forwards it to `inner` if set.
pub struct RecordingPush {
    inner: Option<Arc<dyn UserPush>>,
    calls: Mutex<Vec<(String, Message)>>,
}

impl RecordingPush {
    pub fn new(inner: Option<Arc<dyn UserPush>>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Message)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl UserPush for RecordingPush {
    fn send_to_user(&self, user_id: &str, message: Message) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((user_id.to_string(), message.clone()));
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.send_to_user(user_id, message))
    }
}
