// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::types::Message;

/// Push into every live connection of a user.
///
/// The alert engine holds this instead of the hub itself. Delivery is
/// best-effort: nothing is buffered for users without live connections.
pub trait UserPush: Send + Sync + 'static {
    /// Enqueue `message` for each of the user's clients. Returns how many
    /// outboxes accepted it.
    fn send_to_user(&self, user_id: &str, message: Message) -> usize;
}
