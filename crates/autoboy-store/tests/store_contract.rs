// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour every `DocumentStore` backend must share.

use std::sync::Arc;

use autoboy_core::{
    AutoboyError, ChangeKind, Document, DocumentStore, Filter, FindOptions, SortOrder, Stage,
    Update,
};
use autoboy_store::{MemoryStore, SqliteStore};
use serde_json::{Value, json};
use tempfile::TempDir;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

async fn backends() -> (Vec<(&'static str, Arc<dyn DocumentStore>)>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.db");
    let sqlite = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
    (
        vec![
            ("memory", Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>),
            ("sqlite", Arc::new(sqlite)),
        ],
        dir,
    )
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store
            .insert_one("notifications", doc(json!({"_id": "n1"})))
            .await
            .unwrap();
        let err = store
            .insert_one("notifications", doc(json!({"_id": "n1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AutoboyError::Duplicate { .. }), "{name}: {err}");
        // Same id in another collection is fine.
        store
            .insert_one("users", doc(json!({"_id": "n1"})))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn concurrent_cas_admits_one_winner() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store
            .insert_one("price_alerts", doc(json!({"_id": "a1", "status": "active"})))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update_one(
                        "price_alerts",
                        &Filter::id("a1").and(Filter::eq("status", "active")),
                        &Update::new().set("status", "triggered"),
                    )
                    .await
                    .unwrap()
                    .modified
            }));
        }
        let mut wins = 0;
        for t in tasks {
            wins += t.await.unwrap();
        }
        assert_eq!(wins, 1, "{name}");
    }
}

#[tokio::test]
async fn update_many_counts_matched_and_modified() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        for (id, status) in [("1", "active"), ("2", "active"), ("3", "expired")] {
            store
                .insert_one("price_alerts", doc(json!({"_id": id, "status": status})))
                .await
                .unwrap();
        }
        let result = store
            .update_many(
                "price_alerts",
                &Filter::In("status".into(), vec![json!("active"), json!("expired")]),
                &Update::new().set("status", "expired"),
            )
            .await
            .unwrap();
        assert_eq!((result.matched, result.modified), (3, 2), "{name}");
    }
}

#[tokio::test]
async fn find_sorts_and_pages() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        for (id, price) in [("p1", 300.0), ("p2", 99.5), ("p3", 150.0), ("p4", 20.0)] {
            store
                .insert_one("products", doc(json!({"_id": id, "price": price})))
                .await
                .unwrap();
        }
        let page = store
            .find(
                "products",
                &Filter::gte("price", 50),
                &FindOptions::default()
                    .sort("price", SortOrder::Desc)
                    .skip(1)
                    .limit(5),
            )
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["p3", "p2"], "{name}");
    }
}

#[tokio::test]
async fn watch_reports_insert_update_delete() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        let mut stream = store.watch("products");
        store
            .insert_one("products", doc(json!({"_id": "p1", "price": 120})))
            .await
            .unwrap();
        store
            .update_one("products", &Filter::id("p1"), &Update::new().set("price", 95))
            .await
            .unwrap();
        store
            .delete_one("products", &Filter::id("p1"))
            .await
            .unwrap();

        let kinds: Vec<ChangeKind> = vec![
            stream.next().await.unwrap().kind,
            stream.next().await.unwrap().kind,
            stream.next().await.unwrap().kind,
        ];
        assert_eq!(
            kinds,
            [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
            "{name}"
        );
    }
}

#[tokio::test]
async fn aggregate_counts_matching_documents() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        for i in 0..5 {
            store
                .insert_one(
                    "price_alerts",
                    doc(json!({"user_id": if i < 3 { "u1" } else { "u2" }})),
                )
                .await
                .unwrap();
        }
        let out = store
            .aggregate(
                "price_alerts",
                &[
                    Stage::Match(Filter::eq("user_id", "u1")),
                    Stage::Count("total".into()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(out[0]["total"], 3, "{name}");
        assert_eq!(
            store
                .count_documents("price_alerts", &Filter::eq("user_id", "u2"))
                .await
                .unwrap(),
            2,
            "{name}"
        );
    }
}

#[tokio::test]
async fn sqlite_contents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");
    let path = path.to_str().unwrap();
    {
        let store = SqliteStore::open(path).await.unwrap();
        store
            .insert_one("users", doc(json!({"_id": "u1", "email": "a@example.com"})))
            .await
            .unwrap();
        autoboy_core::PluginAdapter::shutdown(&store).await.unwrap();
    }
    let store = SqliteStore::open(path).await.unwrap();
    let user = store.find_one("users", &Filter::id("u1")).await.unwrap().unwrap();
    assert_eq!(user["email"], "a@example.com");
}
