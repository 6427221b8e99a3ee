use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::utils::clock::Clock;

pub const ALERT_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// What an alert is about. Together with [AlertLevel] it identifies duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertClass {
    QuotaWarning,
    QuotaCritical,
    PersistenceFailure,
    CleanupFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAlert {
    pub id: u64,
    pub level: AlertLevel,
    pub class: AlertClass,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    /// Active alerts suppress new alerts of the same level and class.
    pub active: bool,
}

/// Receives failures of session flushes. The session keeps running regardless.
#[cfg_attr(test, automock)]
pub trait ErrorSink: Send + Sync {
    fn persistence_failed(&self, error: &anyhow::Error);

    fn persistence_recovered(&self);
}

#[derive(Default)]
struct AlertState {
    alerts: VecDeque<StorageAlert>,
    next_id: u64,
}

/// Capped, process local history of alerts.
pub struct AlertLog {
    state: Mutex<AlertState>,
    clock: Arc<dyn Clock>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(clock, ALERT_CAPACITY)
    }

    pub fn with_capacity(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            state: Mutex::default(),
            clock,
            capacity: capacity.max(1),
        }
    }

    /// Records an alert unless an active one with the same level and class exists. Returns the
    /// id of the new alert.
    pub fn raise(&self, level: AlertLevel, class: AlertClass, message: String) -> Option<u64> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state
            .alerts
            .iter()
            .any(|alert| alert.active && alert.level == level && alert.class == class)
        {
            return None;
        }

        match level {
            AlertLevel::Warning => warn!("Storage alert {class:?}: {message}"),
            AlertLevel::Critical => error!("Storage alert {class:?}: {message}"),
        }

        let id = state.next_id;
        state.next_id += 1;
        state.alerts.push_back(StorageAlert {
            id,
            level,
            class,
            message,
            raised_at: self.clock.time(),
            active: true,
        });
        while state.alerts.len() > self.capacity {
            state.alerts.pop_front();
        }
        Some(id)
    }

    /// Deactivates every alert of `class`. Returns how many were active.
    pub fn resolve(&self, class: AlertClass) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut resolved = 0;
        for alert in state.alerts.iter_mut().filter(|v| v.active && v.class == class) {
            alert.active = false;
            resolved += 1;
        }
        if resolved > 0 {
            info!("Resolved {resolved} {class:?} alerts");
        }
        resolved
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.alerts.iter_mut().find(|v| v.id == id) {
            Some(alert) => {
                alert.active = false;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Vec<StorageAlert> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.alerts.iter().cloned().collect()
    }

    pub fn active(&self) -> Vec<StorageAlert> {
        self.snapshot().into_iter().filter(|v| v.active).collect()
    }
}

impl ErrorSink for AlertLog {
    fn persistence_failed(&self, error: &anyhow::Error) {
        self.raise(
            AlertLevel::Critical,
            AlertClass::PersistenceFailure,
            format!("Failed to save browsing time: {error:#}"),
        );
    }

    fn persistence_recovered(&self) {
        self.resolve(AlertClass::PersistenceFailure);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::utils::clock::testing::ManualClock;

    use super::{AlertClass, AlertLevel, AlertLog, ErrorSink};

    #[test]
    fn test_active_alerts_are_deduplicated() {
        let log = AlertLog::new(ManualClock::new());
        assert!(log
            .raise(AlertLevel::Critical, AlertClass::QuotaCritical, "90%".into())
            .is_some());
        assert!(log
            .raise(AlertLevel::Critical, AlertClass::QuotaCritical, "91%".into())
            .is_none());
        assert!(log
            .raise(AlertLevel::Warning, AlertClass::QuotaWarning, "71%".into())
            .is_some());
        assert_eq!(log.active().len(), 2);
    }

    #[test]
    fn test_resolved_alerts_can_be_raised_again() {
        let log = AlertLog::new(ManualClock::new());
        log.raise(AlertLevel::Critical, AlertClass::QuotaCritical, "90%".into());
        assert_eq!(log.resolve(AlertClass::QuotaCritical), 1);
        assert!(log
            .raise(AlertLevel::Critical, AlertClass::QuotaCritical, "90%".into())
            .is_some());
        assert_eq!(log.snapshot().len(), 2);
        assert_eq!(log.active().len(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let log = AlertLog::with_capacity(ManualClock::new(), 3);
        for i in 0..5 {
            let id = log
                .raise(AlertLevel::Warning, AlertClass::QuotaWarning, format!("{i}"))
                .unwrap();
            log.dismiss(id);
        }
        let ids = log.snapshot().into_iter().map(|v| v.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_persistence_failures_raise_one_critical_alert() {
        let log = AlertLog::new(ManualClock::new());
        log.persistence_failed(&anyhow!("disk full"));
        log.persistence_failed(&anyhow!("disk still full"));
        let active = log.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].class, AlertClass::PersistenceFailure);
        assert_eq!(active[0].level, AlertLevel::Critical);

        log.persistence_recovered();
        assert!(log.active().is_empty());
    }
}
