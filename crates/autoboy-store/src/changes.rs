// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use autoboy_core::{ChangeEvent, ChangeKind, ChangeStream, Document};
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const CHANGE_BUFFER: usize = 1024;

/// Fan-out of committed writes to `watch` subscribers.
pub(crate) struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self { tx }
    }

    pub(crate) fn publish(&self, collection: &str, id: String, kind: ChangeKind, document: Document) {
        // No subscribers is not an error.
        let _ = self.tx.send(ChangeEvent {
            collection: collection.to_string(),
            id,
            kind,
            document,
        });
    }

    pub(crate) fn subscribe(&self, collection: &str) -> ChangeStream {
        ChangeStream::new(collection, self.tx.subscribe())
    }
}
