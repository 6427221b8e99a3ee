//! Storage monitor: polls the quota of the usage store, raises alerts when thresholds are crossed
//! and evicts old records automatically when the store is critically full.

pub mod alerts;

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use alerts::{AlertClass, AlertLevel, AlertLog, StorageAlert};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{settings::Settings, utils::clock::Clock};

use super::storage::{
    entities::{Retention, StorageQuota},
    ledger::UsageLedger,
    usage_store::UsageStore,
};

pub const CLEANUP_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CleanupTrigger {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupEvent {
    pub at: DateTime<Utc>,
    pub trigger: CleanupTrigger,
    pub retention: Retention,
    pub removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuotaLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub warning_percentage: f64,
    pub critical_percentage: f64,
    pub auto_retention: Retention,
}

impl From<&Settings> for MonitorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.quota_poll_interval(),
            warning_percentage: settings.warning_percentage,
            critical_percentage: settings.critical_percentage,
            auto_retention: settings.auto_cleanup_retention(),
        }
    }
}

impl MonitorConfig {
    pub fn level(&self, quota: &StorageQuota) -> QuotaLevel {
        if *quota.percentage >= self.critical_percentage {
            QuotaLevel::Critical
        } else if *quota.percentage >= self.warning_percentage {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }
}

/// What the dashboard gets when it asks for the state of storage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub quota: StorageQuota,
    pub cleanup_events: Vec<CleanupEvent>,
    pub alerts: Vec<StorageAlert>,
}

/// Releases the cleanup flag when the cleanup finishes, however it finishes.
struct CleanupGuard<'a>(&'a AtomicBool);

impl<'a> CleanupGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StorageMonitor<S> {
    ledger: Arc<UsageLedger<S>>,
    alerts: Arc<AlertLog>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    cleanup_in_progress: AtomicBool,
    cleanups: Mutex<VecDeque<CleanupEvent>>,
}

impl<S: UsageStore> StorageMonitor<S> {
    pub fn new(
        ledger: Arc<UsageLedger<S>>,
        alerts: Arc<AlertLog>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            ledger,
            alerts,
            clock,
            config,
            cleanup_in_progress: AtomicBool::new(false),
            cleanups: Mutex::default(),
        }
    }

    /// Polls the quota until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut poll_point = self.clock.instant();
        loop {
            match self
                .poll()
                .instrument(info_span!("Polling storage quota"))
                .await
            {
                Ok(Some(quota)) => debug!("Storage at {}", quota.percentage),
                Ok(None) => debug!("Skipped quota poll, cleanup in progress"),
                Err(e) => error!("Failed to poll storage quota {e:?}"),
            }

            poll_point += self.config.poll_interval;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(poll_point) => ()
            }
        }
    }

    /// One monitoring step. Returns the quota after any automatic cleanup, or `None` when the poll
    /// was skipped because a cleanup is running.
    pub async fn poll(&self) -> Result<Option<StorageQuota>> {
        if self.cleanup_in_progress.load(Ordering::Acquire) {
            return Ok(None);
        }

        let quota = self.ledger.quota().await?;
        let level = self.config.level(&quota);
        self.update_alerts(level, &quota);

        if level < QuotaLevel::Critical {
            return Ok(Some(quota));
        }

        info!(
            "Storage is critically full ({}), cleaning up with retention {}",
            quota.percentage, self.config.auto_retention
        );
        self.cleanup(self.config.auto_retention, CleanupTrigger::Automatic)
            .await
            .ok();

        let quota = self.ledger.quota().await?;
        self.update_alerts(self.config.level(&quota), &quota);
        Ok(Some(quota))
    }

    fn update_alerts(&self, level: QuotaLevel, quota: &StorageQuota) {
        match level {
            QuotaLevel::Normal => {
                self.alerts.resolve(AlertClass::QuotaWarning);
                self.alerts.resolve(AlertClass::QuotaCritical);
            }
            QuotaLevel::Warning => {
                self.alerts.resolve(AlertClass::QuotaCritical);
                self.alerts.raise(
                    AlertLevel::Warning,
                    AlertClass::QuotaWarning,
                    format!(
                        "Storage usage is at {} ({} bytes left)",
                        quota.percentage, quota.available
                    ),
                );
            }
            QuotaLevel::Critical => {
                self.alerts.resolve(AlertClass::QuotaWarning);
                self.alerts.raise(
                    AlertLevel::Critical,
                    AlertClass::QuotaCritical,
                    format!(
                        "Storage usage is critical at {} ({} bytes left)",
                        quota.percentage, quota.available
                    ),
                );
            }
        }
    }

    /// Removes records older than `retention`. Only one cleanup runs at a time: a call made while
    /// another cleanup is in flight removes nothing and reports 0.
    pub async fn cleanup(&self, retention: Retention, trigger: CleanupTrigger) -> Result<usize> {
        let Some(_guard) = CleanupGuard::try_acquire(&self.cleanup_in_progress) else {
            info!("Cleanup already in progress, dropping {trigger:?} request");
            return Ok(0);
        };

        let result = self.ledger.cleanup(retention).await;
        let event = CleanupEvent {
            at: self.clock.time(),
            trigger,
            retention,
            removed: *result.as_ref().unwrap_or(&0),
            error: result.as_ref().err().map(|e| format!("{e:#}")),
        };
        self.push_cleanup(event);

        match &result {
            Ok(_) => {
                self.alerts.resolve(AlertClass::CleanupFailure);
            }
            Err(e) => {
                self.alerts.raise(
                    AlertLevel::Critical,
                    AlertClass::CleanupFailure,
                    format!("Storage cleanup failed: {e:#}"),
                );
            }
        }
        result
    }

    fn push_cleanup(&self, event: CleanupEvent) {
        let mut cleanups = self.cleanups.lock().unwrap_or_else(PoisonError::into_inner);
        cleanups.push_back(event);
        while cleanups.len() > CLEANUP_HISTORY_CAPACITY {
            cleanups.pop_front();
        }
    }

    pub fn cleanup_events(&self) -> Vec<CleanupEvent> {
        let cleanups = self.cleanups.lock().unwrap_or_else(PoisonError::into_inner);
        cleanups.iter().cloned().collect()
    }

    pub async fn status(&self) -> Result<StorageStatus> {
        Ok(StorageStatus {
            quota: self.ledger.quota().await?,
            cleanup_events: self.cleanup_events(),
            alerts: self.alerts.snapshot(),
        })
    }
}
