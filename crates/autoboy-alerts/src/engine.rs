// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evaluation passes over active alerts.
//!
//! A pass first expires overdue alerts, then checks every remaining active
//! alert against its product's current price. Alerts are evaluated
//! independently and concurrently; a failure on one alert never stops the
//! pass.

use std::time::Instant;

use autoboy_core::AutoboyError;
use autoboy_prometheus::recording;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::model::{NewAlert, PriceAlert};
use crate::repo::AlertRepository;

/// Tally of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    /// Active, unexpired alerts examined.
    pub scanned: usize,
    pub triggered: usize,
    pub expired: usize,
    pub unchanged: usize,
    /// Product missing or inactive.
    pub skipped: usize,
    /// Another evaluator triggered the alert first.
    pub race_lost: usize,
    pub failed: usize,
}

impl EvaluationReport {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Triggered => self.triggered += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::RaceLost => self.race_lost += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Triggered,
    Unchanged,
    Skipped,
    RaceLost,
    Failed,
}

/// The price-alert evaluator.
pub struct AlertEngine {
    repo: AlertRepository,
    dispatcher: Dispatcher,
    concurrency: usize,
}

impl AlertEngine {
    pub fn new(repo: AlertRepository, dispatcher: Dispatcher, concurrency: usize) -> Self {
        Self {
            repo,
            dispatcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn repository(&self) -> &AlertRepository {
        &self.repo
    }

    pub async fn create(&self, alert: NewAlert) -> Result<PriceAlert, AutoboyError> {
        self.repo.create(alert).await
    }

    pub async fn cancel(&self, alert_id: &str) -> Result<PriceAlert, AutoboyError> {
        self.repo.cancel(alert_id).await
    }

    /// Return a triggered (or expired, with a new future `expires_at`)
    /// alert to `active` with a new target price.
    pub async fn reactivate(
        &self,
        alert_id: &str,
        target_price: f64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PriceAlert, AutoboyError> {
        self.repo.reactivate(alert_id, target_price, expires_at).await
    }

    /// One full pass over every active alert.
    pub async fn evaluate_all(&self) -> Result<EvaluationReport, AutoboyError> {
        self.evaluate(None).await
    }

    /// A pass restricted to the alerts on one product.
    pub async fn evaluate_product(&self, product_id: &str) -> Result<EvaluationReport, AutoboyError> {
        self.evaluate(Some(product_id)).await
    }

    async fn evaluate(&self, product_id: Option<&str>) -> Result<EvaluationReport, AutoboyError> {
        let started = Instant::now();
        let now = self.repo.now();
        let mut report = EvaluationReport::default();

        match self.repo.expire_due(now, product_id).await {
            Ok(expired) => {
                for _ in 0..expired {
                    recording::record_alert_transition("expired");
                }
                report.expired = expired;
            }
            Err(e) => warn!(error = %e, "expiry sweep failed, retrying next pass"),
        }

        let alerts = self.repo.active_alerts(now, product_id).await?;
        report.scanned = alerts.len();

        let outcomes: Vec<Outcome> = stream::iter(alerts)
            .map(|alert| self.evaluate_one(alert, now))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            report.add(outcome);
        }

        let elapsed = started.elapsed();
        recording::record_evaluation(elapsed);
        if report.triggered > 0 || report.expired > 0 || report.failed > 0 {
            info!(
                product_id = product_id.unwrap_or("*"),
                scanned = report.scanned,
                triggered = report.triggered,
                expired = report.expired,
                failed = report.failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "alert evaluation pass complete"
            );
        } else {
            debug!(scanned = report.scanned, "alert evaluation pass complete, no changes");
        }
        Ok(report)
    }

    async fn evaluate_one(&self, alert: PriceAlert, now: DateTime<Utc>) -> Outcome {
        let product = match self.repo.product(&alert.product_id).await {
            Ok(Some(product)) if product.is_active => product,
            Ok(_) => {
                debug!(alert_id = %alert.id, product_id = %alert.product_id, "product missing or inactive");
                return Outcome::Skipped;
            }
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "product lookup failed");
                return Outcome::Failed;
            }
        };
        let price = product.price;

        if !alert.direction.is_hit(price, alert.target_price) {
            if let Err(e) = self.repo.observe_price(&alert, price, now).await {
                debug!(alert_id = %alert.id, error = %e, "price observation not recorded");
            }
            return Outcome::Unchanged;
        }

        match self.repo.try_trigger(&alert, price, now).await {
            Ok(true) => {}
            Ok(false) => {
                let lost = AutoboyError::TriggerRaceLost {
                    alert_id: alert.id.clone(),
                };
                debug!(error = %lost, "skipping notification");
                return Outcome::RaceLost;
            }
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "trigger write failed, will retry next pass");
                return Outcome::Failed;
            }
        }
        recording::record_alert_transition("triggered");
        info!(
            alert_id = %alert.id,
            user_id = %alert.user_id,
            price,
            target = alert.target_price,
            "price alert triggered"
        );

        if let Err(e) = self.dispatcher.dispatch(&alert, &product, price, now).await {
            warn!(alert_id = %alert.id, error = %e, "notification dispatch failed");
        }
        Outcome::Triggered
    }
}
