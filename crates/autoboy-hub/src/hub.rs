// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The client registry: rooms, user inboxes and fan-out.
//!
//! All membership lives behind one [`RwLock`]. Fan-out enqueues into
//! outboxes with `try_send` while holding the read side, then evicts any
//! client whose outbox was full under the write side. No lock is held
//! across an `.await`. A separate fan-out mutex serializes broadcasts so
//! that every client observes them in the same relative order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use autoboy_core::{AutoboyError, Message, MessageType, UserPush};
use autoboy_prometheus::recording;
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::client::{Client, ClientEntry, ClientInfo};
use crate::ratelimit::RateLimiter;

#[derive(Default)]
struct Registry {
    clients: HashMap<String, ClientEntry>,
    rooms: HashMap<String, HashSet<String>>,
    users: HashMap<String, HashSet<String>>,
}

/// Registry of live connections.
pub struct Hub {
    registry: RwLock<Registry>,
    fanout: Mutex<()>,
    limiter: RateLimiter,
}

impl Hub {
    pub fn new(inbound_rate_per_second: u32) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            fanout: Mutex::new(()),
            limiter: RateLimiter::new(inbound_rate_per_second),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a client and queue its `connection_established` frame.
    pub fn register(&self, client: Client) -> Result<(), AutoboyError> {
        let Client {
            id,
            user_id,
            outbox,
            cancel,
        } = client;

        let mut registry = self.write();
        if registry.clients.contains_key(&id) {
            return Err(AutoboyError::AlreadyRegistered { client_id: id });
        }

        let welcome = Message::from_value(
            MessageType::ConnectionEstablished,
            json!({ "client_id": id, "user_id": user_id }),
        );
        // A fresh outbox always has room for the first frame.
        let _ = outbox.try_send(Arc::new(welcome));

        registry
            .users
            .entry(user_id.clone())
            .or_default()
            .insert(id.clone());
        registry
            .clients
            .insert(id.clone(), ClientEntry::new(user_id.clone(), outbox, cancel));
        recording::set_connected_clients(registry.clients.len());
        drop(registry);

        debug!(client_id = %id, user_id = %user_id, "client registered");
        Ok(())
    }

    /// Remove a client from every room and close its outbox.
    ///
    /// Returns false when the client was not registered; calling it twice is
    /// harmless.
    pub fn unregister(&self, client_id: &str) -> bool {
        self.remove(client_id).is_some()
    }

    fn remove(&self, client_id: &str) -> Option<ClientEntry> {
        let mut registry = self.write();
        let entry = registry.clients.remove(client_id)?;

        for room in &entry.rooms {
            if let Some(members) = registry.rooms.get_mut(room) {
                members.remove(client_id);
                if members.is_empty() {
                    registry.rooms.remove(room);
                }
            }
        }

        let last_for_user = match registry.users.get_mut(&entry.user_id) {
            Some(ids) => {
                ids.remove(client_id);
                ids.is_empty()
            }
            None => true,
        };
        if last_for_user {
            registry.users.remove(&entry.user_id);
            self.limiter.forget(&entry.user_id);
        }

        recording::set_connected_clients(registry.clients.len());
        recording::set_rooms(registry.rooms.len());
        drop(registry);

        debug!(client_id, user_id = %entry.user_id, "client unregistered");
        Some(entry)
    }

    pub fn join_room(&self, client_id: &str, room_id: &str) -> Result<(), AutoboyError> {
        let mut registry = self.write();
        let Some(entry) = registry.clients.get_mut(client_id) else {
            return Err(AutoboyError::UnknownClient {
                client_id: client_id.to_string(),
            });
        };
        entry.rooms.insert(room_id.to_string());
        registry
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(client_id.to_string());
        recording::set_rooms(registry.rooms.len());
        Ok(())
    }

    /// Leave a room; the room is deleted once empty.
    pub fn leave_room(&self, client_id: &str, room_id: &str) -> Result<(), AutoboyError> {
        let mut registry = self.write();
        let Some(entry) = registry.clients.get_mut(client_id) else {
            return Err(AutoboyError::UnknownClient {
                client_id: client_id.to_string(),
            });
        };
        entry.rooms.remove(room_id);
        if let Some(members) = registry.rooms.get_mut(room_id) {
            members.remove(client_id);
            if members.is_empty() {
                registry.rooms.remove(room_id);
            }
        }
        recording::set_rooms(registry.rooms.len());
        Ok(())
    }

    /// Deliver to every registered client. Returns accepted deliveries.
    pub fn broadcast(&self, message: Message) -> usize {
        self.deliver(message, |registry| registry.clients.keys().cloned().collect())
    }

    pub fn broadcast_to_room(&self, room_id: &str, message: Message) -> usize {
        self.broadcast_to_room_except(room_id, message, None)
    }

    /// Deliver to a room's members, skipping the client `except` if given.
    pub fn broadcast_to_room_except(
        &self,
        room_id: &str,
        message: Message,
        except: Option<&str>,
    ) -> usize {
        self.deliver(message, |registry| {
            registry
                .rooms
                .get(room_id)
                .map(|members| {
                    members
                        .iter()
                        .filter(|id| Some(id.as_str()) != except)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Deliver to every client of `user_id`; zero when the user is offline.
    pub fn send_to_user(&self, user_id: &str, message: Message) -> usize {
        self.deliver(message, |registry| {
            registry
                .users
                .get(user_id)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn deliver(&self, message: Message, targets: impl FnOnce(&Registry) -> Vec<String>) -> usize {
        let message = Arc::new(message);
        let _order = self.fanout.lock().unwrap_or_else(PoisonError::into_inner);

        let mut delivered = 0;
        let mut slow = Vec::new();
        {
            let registry = self.read();
            for id in targets(&registry) {
                let Some(entry) = registry.clients.get(&id) else {
                    continue;
                };
                match entry.outbox.try_send(Arc::clone(&message)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => slow.push(id),
                    // The writer is gone; its connection guard unregisters it.
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        }

        for id in slow {
            let err = AutoboyError::DeliveryDropped {
                client_id: id.clone(),
            };
            warn!(client_id = %id, "{err}, disconnecting slow consumer");
            recording::record_dropped("slow_consumer");
            if let Some(entry) = self.remove(&id) {
                entry.cancel.cancel();
            }
        }
        delivered
    }

    /// Refresh the client's `last_pong_at`; false for unknown clients.
    pub fn record_pong(&self, client_id: &str) -> bool {
        let mut registry = self.write();
        match registry.clients.get_mut(client_id) {
            Some(entry) => {
                entry.last_pong_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    /// Admit or refuse one inbound frame from `user_id`.
    pub fn allow_inbound(&self, user_id: &str) -> bool {
        self.limiter.allow(user_id)
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        let registry = self.read();
        let mut infos: Vec<_> = registry
            .clients
            .iter()
            .map(|(id, entry)| entry.info(id))
            .collect();
        infos.sort_by(|a, b| a.connected_at.cmp(&b.connected_at).then(a.id.cmp(&b.id)));
        infos
    }

    pub fn client_count(&self) -> usize {
        self.read().clients.len()
    }

    pub fn room_count(&self) -> usize {
        self.read().rooms.len()
    }

    pub fn room_members(&self, room_id: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .read()
            .rooms
            .get(room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.read().users.contains_key(user_id)
    }

    #[cfg(test)]
    pub(crate) fn is_registered(&self, client_id: &str) -> bool {
        self.read().clients.contains_key(client_id)
    }

    /// Unregister every client, closing all outboxes.
    pub fn close_all(&self) -> usize {
        let ids: Vec<String> = self.read().clients.keys().cloned().collect();
        ids.iter().filter(|id| self.unregister(id)).count()
    }

    /// Users the inbound limiter currently holds a window for.
    pub fn rate_limited_users(&self) -> usize {
        self.limiter.tracked_users()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(10)
    }
}

impl UserPush for Hub {
    fn send_to_user(&self, user_id: &str, message: Message) -> usize {
        Hub::send_to_user(self, user_id, message)
    }
}
