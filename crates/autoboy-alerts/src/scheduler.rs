// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background drivers for the engine: a periodic full pass and a reaction
//! to product price changes.

use std::sync::Arc;
use std::time::Duration;

use autoboy_core::ChangeKind;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::AlertEngine;
use crate::repo::PRODUCTS;

/// Run `evaluate_all` every `interval` until `cancel` fires.
///
/// Ticks that fall behind a slow pass are skipped rather than bunched up.
/// The first pass runs one interval after start.
pub async fn schedule_loop(engine: Arc<AlertEngine>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Skip the immediate first tick.
    ticker.tick().await;
    info!(interval_secs = interval.as_secs(), "alert scheduler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("alert scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = engine.evaluate_all().await {
                    warn!(error = %e, "alert evaluation pass failed, retrying next interval");
                }
            }
        }
    }
}

/// Re-evaluate a product's alerts whenever the product is inserted or
/// updated, until `cancel` fires.
pub async fn watch_prices(engine: Arc<AlertEngine>, cancel: CancellationToken) {
    let mut changes = engine.repository().store().watch(PRODUCTS);
    info!("price watcher started");

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = changes.next() => event,
        };
        let Some(event) = event else {
            debug!("product change stream closed");
            break;
        };
        if event.kind == ChangeKind::Delete {
            continue;
        }
        if let Err(e) = engine.evaluate_product(&event.id).await {
            warn!(product_id = %event.id, error = %e, "product evaluation failed");
        }
    }
    info!("price watcher stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::model::{AlertStatus, Direction, NewAlert};
    use crate::repo::AlertRepository;
    use autoboy_core::{DocumentStore, Filter, ManualClock, Message, NotificationChannel, Update, UserPush};
    use autoboy_store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct NoPush;

    impl UserPush for NoPush {
        fn send_to_user(&self, _: &str, _: Message) -> usize {
            0
        }
    }

    async fn engine(store: Arc<MemoryStore>) -> Arc<AlertEngine> {
        store
            .insert_one(PRODUCTS, json!({"_id": "p1", "price": 120.0}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let repo = AlertRepository::new(store, clock, Duration::from_secs(5), 16);
        let log = |c| -> Arc<dyn autoboy_core::NotificationSink> {
            Arc::new(autoboy_notify::LogSink::new(c))
        };
        let dispatcher = Dispatcher::new(
            repo.clone(),
            Arc::new(NoPush),
            log(NotificationChannel::Email),
            log(NotificationChannel::Sms),
            Duration::from_secs(5),
        );
        Arc::new(AlertEngine::new(repo, dispatcher, 2))
    }

    fn alert() -> NewAlert {
        NewAlert {
            user_id: "u1".into(),
            product_id: "p1".into(),
            target_price: 100.0,
            direction: Direction::Below,
            notify_email: false,
            notify_sms: false,
            notify_push: false,
            expires_at: None,
        }
    }

    async fn wait_for_status(engine: &AlertEngine, id: &str, status: AlertStatus) {
        for _ in 0..200 {
            let alert = engine.repository().get(id).await.unwrap().unwrap();
            if alert.status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("alert {id} never reached {status}");
    }

    #[tokio::test]
    async fn price_update_triggers_without_waiting_for_a_tick() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone()).await;
        let created = engine.create(alert()).await.unwrap();

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_prices(engine.clone(), cancel.clone()));
        tokio::task::yield_now().await;

        store
            .update_one(PRODUCTS, &Filter::id("p1"), &Update::new().set("price", 95.0))
            .await
            .unwrap();
        wait_for_status(&engine, &created.id, AlertStatus::Triggered).await;

        cancel.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_loop_runs_passes_until_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone()).await;
        let created = engine.create(alert()).await.unwrap();
        store
            .update_one(PRODUCTS, &Filter::id("p1"), &Update::new().set("price", 90.0))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(schedule_loop(engine.clone(), Duration::from_secs(30), cancel.clone()));

        // Nothing runs before the first interval elapses.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let before = engine.repository().get(&created.id).await.unwrap().unwrap();
        assert_eq!(before.status, AlertStatus::Active);

        tokio::time::sleep(Duration::from_secs(25)).await;
        wait_for_status(&engine, &created.id, AlertStatus::Triggered).await;

        cancel.cancel();
        task.await.unwrap();
    }
}
