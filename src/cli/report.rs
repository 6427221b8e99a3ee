use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    host::storage::{entities::UsageRecord, ledger::UsageLedger, usage_store::UsageStore},
    utils::percentage::{duration_percentage, Percentage},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        help = "Day to report. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(short = 'p', long = "percentage", help = "Hide domains below the specified share of the day", default_value_t = Percentage::new_opt(0.).unwrap())]
    min_percentage: Percentage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub domain: String,
    pub duration: Duration,
    pub percentage: Percentage,
}

/// Command to process `report` command. Prints time spent per domain on a single day, most used
/// first.
pub async fn process_report_command<S: UsageStore>(
    ReportCommand {
        date,
        date_style,
        min_percentage,
    }: ReportCommand,
    ledger: &UsageLedger<S>,
) -> Result<()> {
    let day = match date {
        Some(date) => parse_day(&date, date_style, Local::now())?,
        None => ledger.today(),
    };

    let records = ledger.query_by_date(day).await?;
    let lines = build_report(records, min_percentage);
    if lines.is_empty() {
        println!("Nothing recorded on {day}");
        return Ok(());
    }

    let total = lines
        .iter()
        .fold(Duration::zero(), |total, line| total + line.duration);
    println!("{day}\t{}", format_duration(total));
    for line in lines {
        println!(
            "{}%\t{}\t{}",
            *line.percentage as i32,
            format_duration(line.duration),
            line.domain
        );
    }
    Ok(())
}

fn parse_day(date: &str, date_style: DateStyle, now: DateTime<Local>) -> Result<NaiveDate> {
    match parse_date_string(date, now, date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

/// Sorted by time spent, descending. Shares are relative to everything recorded on the day, even
/// when small domains are hidden.
pub fn build_report(records: Vec<UsageRecord>, min_percentage: Percentage) -> Vec<ReportLine> {
    let total = Duration::milliseconds(records.iter().map(|v| v.time_spent_ms).sum::<u64>() as i64);
    let mut lines = records
        .into_iter()
        .map(|record| {
            let duration = Duration::milliseconds(record.time_spent_ms as i64);
            ReportLine {
                percentage: duration_percentage(duration, total),
                duration,
                domain: record.domain,
            }
        })
        .filter(|line| line.percentage >= min_percentage)
        .collect::<Vec<_>>();
    lines.sort_by(|a, b| {
        b.duration
            .cmp(&a.duration)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    lines
}

fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
