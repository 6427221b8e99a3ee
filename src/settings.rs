//! User tunable settings. They live in an optional `settings.json` inside the application
//! directory; every field has a default so a missing or partial file is fine.

use std::{io::ErrorKind, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::{
    collection::activity::DEFAULT_INACTIVITY_TIMEOUT,
    session::checkpoint::DEFAULT_CHECKPOINT_INTERVAL,
    storage::{entities::Retention, ledger::DEFAULT_MIN_SESSION},
};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Seconds without input before a page reports the user as inactive.
    pub inactivity_timeout_secs: u64,
    /// Period of forced flushes of the open session.
    pub checkpoint_interval_secs: u64,
    pub quota_poll_interval_secs: u64,
    /// Sessions shorter than this are tab-switch noise and are not recorded.
    pub min_session_ms: u64,
    /// `-1` keeps records forever.
    pub retention_days: Retention,
    /// Retention used by automatic cleanup when storage is critically full.
    pub auto_cleanup_retention_days: u32,
    pub storage_budget_bytes: u64,
    pub warning_percentage: f64,
    pub critical_percentage: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT.as_secs(),
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL.as_secs(),
            quota_poll_interval_secs: 60,
            min_session_ms: DEFAULT_MIN_SESSION.num_milliseconds() as u64,
            retention_days: Retention::Days(90),
            auto_cleanup_retention_days: 30,
            storage_budget_bytes: 10 * 1024 * 1024,
            warning_percentage: 70.,
            critical_percentage: 85.,
        }
    }
}

impl Settings {
    /// Reads settings from `dir`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE_NAME);
        let settings = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Settings>(&content)
                .with_context(|| format!("Invalid settings file {path:?}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {path:?}, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e).with_context(|| format!("Can't read {path:?}")),
        };
        settings.validate()?;
        info!("Loaded settings {settings:?}");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inactivity_timeout_secs == 0
            || self.checkpoint_interval_secs == 0
            || self.quota_poll_interval_secs == 0
        {
            bail!("Timeouts and intervals must be positive");
        }
        if self.storage_budget_bytes == 0 {
            bail!("Storage budget must be positive");
        }
        if !(0. < self.warning_percentage
            && self.warning_percentage < self.critical_percentage
            && self.critical_percentage <= 100.)
        {
            bail!(
                "Expected 0 < warning ({}) < critical ({}) <= 100",
                self.warning_percentage,
                self.critical_percentage
            );
        }
        Ok(())
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }

    pub fn quota_poll_interval(&self) -> Duration {
        Duration::from_secs(self.quota_poll_interval_secs)
    }

    /// Retention used when storage runs out. Always shorter than the user's own retention so an
    /// automatic cleanup frees something the regular one would keep.
    pub fn auto_cleanup_retention(&self) -> Retention {
        match self.retention_days {
            Retention::Forever => Retention::Days(self.auto_cleanup_retention_days),
            Retention::Days(days) => {
                Retention::Days(self.auto_cleanup_retention_days.min(days.saturating_sub(1)))
            }
        }
    }

    pub fn min_session(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.min_session_ms.min(i64::MAX as u64) as i64)
    }
}
