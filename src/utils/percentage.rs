use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;
use chrono::Duration;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    /// Share of `part` in `whole`. An empty whole yields 0%.
    pub fn of(part: u64, whole: u64) -> Percentage {
        if whole == 0 {
            return Percentage(0.);
        }
        Percentage(part as f64 / whole as f64 * 100.)
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // This means that 100%% also works, but I think I'm fine with that
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub fn duration_percentage(value: Duration, whole: Duration) -> Percentage {
    let value = value.num_milliseconds().max(0) as u64;
    let whole = whole.num_milliseconds().max(0) as u64;
    Percentage::of(value, whole)
}
