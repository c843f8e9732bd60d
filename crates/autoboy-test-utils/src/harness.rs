// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the hub, the alert engine and a document store
//! (in-memory, or SQLite in a temp directory) around a [`ManualClock`], with
//! recording sinks in place of email and SMS. Pushes from the engine go
//! through a [`RecordingPush`] into the real hub, so a test can assert both
//! on the call and on what a connected socket receives.

use std::net::SocketAddr;
use std::sync::Arc;

use autoboy_alerts::{AlertEngine, EngineDeps, NewAlert, PriceAlert, build_engine};
use autoboy_config::{AlertsConfig, StorageConfig};
use autoboy_core::document::{Document, from_document};
use autoboy_core::{
    AutoboyError, Clock, DocumentStore, Filter, ManualClock, NotificationChannel, SessionLookup,
    TokenValidator, Update, UserPush,
};
use autoboy_hub::{
    ConversationAcl, HealthState, Hub, HubSettings, HubState, JwtValidator, OriginPolicy,
    TokenClaims,
};
use autoboy_store::{MemoryStore, SqliteStore};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::mock_push::RecordingPush;
use crate::mock_sink::MockSink;

/// HS256 secret the harness validates tokens with.
pub const TEST_JWT_SECRET: &[u8] = b"autoboy-test-secret-0123456789abcdef";

/// Mint a token for `user_id` valid for ten minutes of wall-clock time.
pub fn mint_token(user_id: &str, user_type: &str) -> String {
    let claims = TokenClaims {
        user_id: user_id.into(),
        user_type: user_type.into(),
        exp: Utc::now().timestamp() + 600,
    };
    // Encoding an HS256 token with a static key cannot fail.
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap_or_default()
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    sqlite: bool,
    alerts: AlertsConfig,
    settings: HubSettings,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            sqlite: false,
            alerts: AlertsConfig::default(),
            settings: HubSettings::default(),
            start: Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Back the harness with a SQLite file in a temp directory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    pub fn with_alerts_config(mut self, alerts: AlertsConfig) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_hub_settings(mut self, settings: HubSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, AutoboyError> {
        let temp_dir = tempfile::TempDir::new().map_err(AutoboyError::store)?;
        let store: Arc<dyn DocumentStore> = if self.sqlite {
            let path = temp_dir.path().join("test.db");
            Arc::new(SqliteStore::open(&path.to_string_lossy()).await?)
        } else {
            Arc::new(MemoryStore::new())
        };

        let clock = Arc::new(ManualClock::new(self.start));
        let hub = Arc::new(Hub::new(self.settings.inbound_rate_per_second));
        let push = Arc::new(RecordingPush::new(Some(hub.clone() as Arc<dyn UserPush>)));
        let email = Arc::new(MockSink::new(NotificationChannel::Email));
        let sms = Arc::new(MockSink::new(NotificationChannel::Sms));

        let engine = build_engine(
            &self.alerts,
            &StorageConfig::default(),
            EngineDeps {
                store: store.clone(),
                clock: clock.clone(),
                push: push.clone(),
                email: email.clone(),
                sms: sms.clone(),
            },
        );

        Ok(TestHarness {
            store,
            clock,
            hub,
            push,
            email,
            sms,
            engine: Arc::new(engine),
            settings: self.settings,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment.
pub struct TestHarness {
    pub store: Arc<dyn DocumentStore>,
    /// Drives alert timestamps and expiry.
    pub clock: Arc<ManualClock>,
    pub hub: Arc<Hub>,
    pub push: Arc<RecordingPush>,
    pub email: Arc<MockSink>,
    pub sms: Arc<MockSink>,
    pub engine: Arc<AlertEngine>,
    pub settings: HubSettings,
    _temp_dir: tempfile::TempDir,
}

/// A hub HTTP server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
}

impl TestServer {
    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws/connect?token={token}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn seed_product(&self, id: &str, price: f64) -> Result<(), AutoboyError> {
        self.store
            .insert_one(
                "products",
                doc(json!({"_id": id, "name": format!("Product {id}"), "price": price, "is_active": true})),
            )
            .await
            .map(|_| ())
    }

    pub async fn set_price(&self, product_id: &str, price: f64) -> Result<(), AutoboyError> {
        self.store
            .update_one("products", &Filter::id(product_id), &Update::new().set("price", price))
            .await
            .map(|_| ())
    }

    /// Insert a user with an email address and optional phone.
    pub async fn seed_user(&self, id: &str, phone: Option<&str>) -> Result<(), AutoboyError> {
        let mut user = json!({
            "_id": id,
            "email": format!("{id}@example.com"),
            "notification_preferences": {"email": true, "push": true, "sms": phone.is_some()},
        });
        if let Some(phone) = phone {
            user["phone"] = json!(phone);
        }
        self.store.insert_one("users", doc(user)).await.map(|_| ())
    }

    pub async fn seed_conversation(&self, id: &str, participants: &[&str]) -> Result<(), AutoboyError> {
        self.store
            .insert_one(
                "conversations",
                doc(json!({"_id": id, "participants": participants})),
            )
            .await
            .map(|_| ())
    }

    /// An active `below` alert with email and push enabled.
    pub async fn alert_below(
        &self,
        user_id: &str,
        product_id: &str,
        target: f64,
    ) -> Result<PriceAlert, AutoboyError> {
        self.engine
            .create(NewAlert {
                user_id: user_id.into(),
                product_id: product_id.into(),
                target_price: target,
                direction: autoboy_alerts::Direction::Below,
                notify_email: true,
                notify_sms: false,
                notify_push: true,
                expires_at: None,
            })
            .await
    }

    pub async fn alert(&self, id: &str) -> Result<PriceAlert, AutoboyError> {
        self.engine
            .repository()
            .get(id)
            .await?
            .ok_or_else(|| AutoboyError::NotFound {
                collection: "price_alerts".into(),
                id: id.into(),
            })
    }

    pub async fn notification_count(&self, user_id: &str) -> Result<u64, AutoboyError> {
        self.store
            .count_documents("notifications", &Filter::eq("user_id", user_id))
            .await
    }

    pub async fn notifications(&self, user_id: &str) -> Result<Vec<Value>, AutoboyError> {
        let docs = self
            .store
            .find(
                "notifications",
                &Filter::eq("user_id", user_id),
                &Default::default(),
            )
            .await?;
        docs.into_iter().map(from_document).collect()
    }

    /// Handler state with JWT auth under [`TEST_JWT_SECRET`], no session
    /// check and any origin allowed.
    pub fn hub_state(&self) -> HubState {
        HubState {
            hub: self.hub.clone(),
            acl: Arc::new(ConversationAcl::new(
                self.store.clone(),
                self.settings.acl_timeout,
            )),
            tokens: Arc::new(JwtValidator::new(TEST_JWT_SECRET)),
            sessions: None,
            origins: OriginPolicy::new(&["*".to_string()]),
            settings: self.settings.clone(),
            admin_user_type: "admin".into(),
            health: HealthState::default(),
        }
    }

    /// Serve the hub on `127.0.0.1:0` until the returned server is dropped.
    pub async fn spawn_server(&self) -> Result<TestServer, AutoboyError> {
        self.spawn_server_with(self.hub_state()).await
    }

    /// Like [`spawn_server`](Self::spawn_server), with caller-supplied
    /// token validation and session lookup.
    pub async fn spawn_server_with_auth(
        &self,
        tokens: Arc<dyn TokenValidator>,
        sessions: Option<Arc<dyn SessionLookup>>,
    ) -> Result<TestServer, AutoboyError> {
        let state = HubState {
            tokens,
            sessions,
            ..self.hub_state()
        };
        self.spawn_server_with(state).await
    }

    async fn spawn_server_with(&self, state: HubState) -> Result<TestServer, AutoboyError> {
        let listener = autoboy_hub::bind("127.0.0.1", 0).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| AutoboyError::Internal(e.to_string()))?;
        let shutdown = CancellationToken::new();
        tokio::spawn(autoboy_hub::serve(listener, state, shutdown.clone()));
        Ok(TestServer { addr, shutdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_seeds_and_triggers() {
        let h = TestHarness::builder().build().await.unwrap();
        h.seed_product("p1", 120.0).await.unwrap();
        h.seed_user("u1", None).await.unwrap();
        let alert = h.alert_below("u1", "p1", 100.0).await.unwrap();

        h.set_price("p1", 99.0).await.unwrap();
        assert_eq!(h.engine.evaluate_all().await.unwrap().triggered, 1);
        assert_eq!(h.alert(&alert.id).await.unwrap().current_price, Some(99.0));
        assert_eq!(h.notification_count("u1").await.unwrap(), 1);
        assert_eq!(h.email.sent_count().await, 1);
        assert_eq!(h.push.call_count(), 1);
    }

    #[tokio::test]
    async fn sqlite_backed_harness() {
        let h = TestHarness::builder().with_sqlite().build().await.unwrap();
        h.seed_product("p1", 10.0).await.unwrap();
        let alert = h.alert_below("u1", "p1", 50.0).await.unwrap();
        assert_eq!(h.engine.evaluate_all().await.unwrap().triggered, 1);
        assert_eq!(
            h.alert(&alert.id).await.unwrap().status,
            autoboy_alerts::AlertStatus::Triggered
        );
    }

    #[tokio::test]
    async fn minted_tokens_validate() {
        let token = mint_token("u1", "admin");
        let claims = JwtValidator::new(TEST_JWT_SECRET).validate(&token).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.user_type, "admin");
    }
}
