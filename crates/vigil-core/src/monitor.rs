//! Monitor supervisors.
//!
//! Two scheduling shapes, matching the two monitor variants:
//!
//! - [`StatusMonitor`] runs one independently timed recurring task per
//!   target, each with its own failure boundary.
//! - [`FreshnessMonitor`] runs one shared timer: each pass fans out over
//!   all URLs, then sends at most one combined alert.
//!
//! Neither shape keeps state between ticks, and neither ever halts on a
//! failed cycle; the next tick simply tries again.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::{FreshnessConfig, Target};
use crate::fetch::FetchError;
use crate::freshness::{FreshnessChecker, FreshnessVerdict};
use crate::notify::{first_line, Notifier, NotifyError};
use crate::status::{ServiceState, StatusChecker};

/// Line separating per-URL diagnostics in a combined freshness alert.
pub const DIAGNOSTIC_SEPARATOR: &str = "\n--------------------\n";

/// Failure of one freshness pass: either a probe fetch or the combined
/// alert delivery.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub struct StatusMonitor {
    targets: Vec<Target>,
    checker: StatusChecker,
    notifier: Notifier,
}

impl StatusMonitor {
    pub fn new(targets: Vec<Target>, checker: StatusChecker, notifier: Notifier) -> Self {
        Self {
            targets,
            checker,
            notifier,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// One cycle for one target: check, log, alert on anything that is
    /// not `running`. Checker failures are reported to the webhook with
    /// only the first line of the error message. Returns `Err` only
    /// when the alert delivery itself fails.
    pub async fn check_target(&self, target: &Target) -> Result<(), NotifyError> {
        info!(target = %target.name, "checking");
        match self.checker.check(&target.url).await {
            Ok(state) => {
                info!(target = %target.name, state = %state, "check complete");
                if state != ServiceState::Running {
                    self.notifier
                        .send(&format!("{} is {}", target.name, state))
                        .await?;
                }
            }
            Err(e) => {
                error!(target = %target.name, error = %e, "check failed");
                self.notifier.send(first_line(&e.to_string())).await?;
            }
        }
        Ok(())
    }

    /// Run every target's cycle once, sequentially, in config order.
    pub async fn check_all_once(&self) {
        for target in &self.targets {
            if let Err(e) = self.check_target(target).await {
                error!(target = %target.name, error = %e, "failed to deliver alert");
            }
        }
    }

    /// Run forever. Each target gets its own task with its own timer:
    /// first check immediately, then every `target.interval`. A tick's
    /// cycle runs to completion before that target's next tick fires;
    /// different targets are not synchronized. A failed cycle is logged
    /// and the timer keeps going.
    pub async fn run(self: Arc<Self>) {
        info!(targets = self.targets.len(), "status monitor started");

        let mut handles = Vec::with_capacity(self.targets.len());
        for target in self.targets.clone() {
            let monitor = Arc::clone(&self);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(target.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(e) = monitor.check_target(&target).await {
                        error!(target = %target.name, error = %e, "failed to deliver alert");
                    }
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

pub struct FreshnessMonitor {
    urls: Vec<String>,
    interval: Duration,
    checker: FreshnessChecker,
    notifier: Notifier,
}

impl FreshnessMonitor {
    pub fn new(config: &FreshnessConfig, checker: FreshnessChecker, notifier: Notifier) -> Self {
        Self {
            urls: config.urls.clone(),
            interval: config.interval,
            checker,
            notifier,
        }
    }

    /// One batch pass: probe every URL concurrently, then send a single
    /// combined alert listing the expired ones in config order. The
    /// first probe failure aborts the whole pass.
    pub async fn run_pass(&self) -> Result<(), PassError> {
        info!(urls = self.urls.len(), "checking urls");

        let verdicts = try_join_all(self.urls.iter().map(|url| self.checker.probe(url))).await?;

        let expired: Vec<&FreshnessVerdict> =
            verdicts.iter().filter(|v| v.is_expired).collect();
        if expired.is_empty() {
            info!("all good");
            return Ok(());
        }

        let message = expired
            .iter()
            .map(|v| v.diagnostic.as_str())
            .collect::<Vec<_>>()
            .join(DIAGNOSTIC_SEPARATOR);
        warn!(expired = expired.len(), "expired urls detected");
        self.notifier.send(&message).await?;
        Ok(())
    }

    async fn pass_with_report(&self) -> Result<(), NotifyError> {
        if let Err(e) = self.run_pass().await {
            error!(error = %e, "freshness pass failed");
            self.notifier.send(first_line(&e.to_string())).await?;
        }
        Ok(())
    }

    /// Run forever: one pass immediately, then one per interval. A
    /// failed pass (or a failed alert about it) is logged and the next
    /// pass proceeds normally.
    pub async fn run(&self) {
        info!(
            urls = self.urls.len(),
            interval_secs = self.interval.as_secs(),
            "freshness monitor started"
        );
        loop {
            if let Err(e) = self.pass_with_report().await {
                error!(error = %e, "failed to deliver alert");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
