use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::{
    percentage::Percentage,
    time::{date_to_record_name, record_name_to_date},
};

/// Time spent on a domain during one local calendar day. Records only ever grow until retention
/// cleanup or an explicit deletion removes them.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub domain: String,
    pub date: NaiveDate,
    pub time_spent_ms: u64,
}

impl UsageRecord {
    pub fn key(&self) -> String {
        record_key(&self.domain, self.date)
    }
}

/// Persisted key of a record, `<domain>_<YYYY-MM-DD>`. Cleanup scans the date suffix of these
/// keys, so the format is part of the storage layout.
pub fn record_key(domain: &str, date: NaiveDate) -> String {
    format!("{domain}_{}", date_to_record_name(date))
}

/// Splits a key back into domain and date. Domains may contain `_`, dates never do.
pub fn parse_record_key(key: &str) -> Option<(&str, NaiveDate)> {
    let (domain, date) = key.rsplit_once('_')?;
    if domain.is_empty() {
        return None;
    }
    Some((domain, record_name_to_date(date)?))
}

/// Snapshot of how much of the storage budget is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    pub used: u64,
    pub available: u64,
    pub percentage: Percentage,
}

impl StorageQuota {
    pub fn new(used: u64, budget: u64) -> Self {
        Self {
            used,
            available: budget.saturating_sub(used),
            percentage: Percentage::of(used, budget),
        }
    }
}

/// How long records are kept. Outside of the process it is written as a day count where `-1`
/// means forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Retention {
    Forever,
    Days(u32),
}

impl TryFrom<i64> for Retention {
    type Error = anyhow::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Retention::Forever),
            v if v < 0 => Err(anyhow!(
                "Retention must be a number of days or -1 for forever, got {v}"
            )),
            v => u32::try_from(v)
                .map(Retention::Days)
                .map_err(|_| anyhow!("Retention of {v} days is too large")),
        }
    }
}

impl From<Retention> for i64 {
    fn from(value: Retention) -> Self {
        match value {
            Retention::Forever => -1,
            Retention::Days(days) => days.into(),
        }
    }
}

impl FromStr for Retention {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "forever" => Ok(Retention::Forever),
            s => s.parse::<i64>()?.try_into(),
        }
    }
}

impl Display for Retention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retention::Forever => write!(f, "forever"),
            Retention::Days(days) => write!(f, "{days} days"),
        }
    }
}
