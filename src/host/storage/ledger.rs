use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument};

use crate::{settings::Settings, utils::clock::Clock, utils::time::days_before};

use super::{
    entities::{Retention, StorageQuota, UsageRecord},
    usage_store::UsageStore,
};

pub const DEFAULT_MIN_SESSION: Duration = Duration::milliseconds(1000);

/// Result of flushing an interval into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded(UsageRecord),
    /// The interval was shorter than the minimum and was discarded.
    Dropped,
}

/// Bridges flushed session intervals and a [UsageStore]. Owns the product rules the store itself
/// doesn't know about: the minimum duration filter, attributing time to the current local day,
/// retention and the storage budget.
pub struct UsageLedger<S> {
    store: S,
    clock: Arc<dyn Clock>,
    min_duration: Duration,
    budget_bytes: u64,
}

impl<S: UsageStore> UsageLedger<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, min_duration: Duration, budget_bytes: u64) -> Self {
        Self {
            store,
            clock,
            min_duration,
            budget_bytes,
        }
    }

    pub fn from_settings(store: S, clock: Arc<dyn Clock>, settings: &Settings) -> Self {
        Self::new(
            store,
            clock,
            settings.min_session(),
            settings.storage_budget_bytes,
        )
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Adds `elapsed` to today's record of `domain`.
    #[instrument(skip(self))]
    pub async fn append(&self, domain: &str, elapsed: Duration) -> Result<AppendOutcome> {
        if elapsed < self.min_duration {
            debug!("Dropping {}ms interval for {domain}", elapsed.num_milliseconds());
            return Ok(AppendOutcome::Dropped);
        }
        let delta_ms = elapsed.num_milliseconds() as u64;
        let record = self.store.increment(domain, self.today(), delta_ms).await?;
        debug!("{domain} now has {}ms on {}", record.time_spent_ms, record.date);
        Ok(AppendOutcome::Recorded(record))
    }

    pub async fn query_by_date(&self, date: NaiveDate) -> Result<Vec<UsageRecord>> {
        self.store.records_for(date).await
    }

    /// Removes records older than `retention` and returns how many went away.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, retention: Retention) -> Result<usize> {
        let Retention::Days(days) = retention else {
            debug!("Retention is forever, nothing to clean up");
            return Ok(0);
        };
        let cutoff = days_before(self.today(), days);
        let removed = self.store.remove_older_than(cutoff).await?;
        info!("Removed {removed} records dated before {cutoff}");
        Ok(removed)
    }

    /// User initiated deletion of one domain or of everything.
    pub async fn delete(&self, domain: Option<&str>) -> Result<usize> {
        let removed = match domain {
            Some(domain) => self.store.remove_domain(domain).await?,
            None => self.store.clear().await?,
        };
        info!("Deleted {removed} records for {}", domain.unwrap_or("all domains"));
        Ok(removed)
    }

    pub async fn quota(&self) -> Result<StorageQuota> {
        let used = self.store.bytes_used().await?;
        Ok(StorageQuota::new(used, self.budget_bytes))
    }
}
