pub mod host_path;
pub mod manifest;
pub mod report;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use host_path::to_host_path;
use manifest::{host_manifest, Browser};
use report::{process_report_command, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    host::{
        monitor::{MonitorConfig, QuotaLevel},
        start_host,
        storage::{entities::Retention, ledger::UsageLedger, usage_store::FileUsageStore},
    },
    settings::Settings,
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Webtally", version, long_about = None)]
#[command(about = "Time spent per website, as recorded by the webtally extension", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to use $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Display time spent per website on a day")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Remove records older than the retention period")]
    Cleanup {
        #[arg(
            long = "retention-days",
            allow_negative_numbers = true,
            help = "Days of records to keep, -1 keeps everything. Defaults to the configured retention"
        )]
        retention: Option<Retention>,
    },
    #[command(about = "Display how much of the storage budget is used")]
    Quota {},
    #[command(
        about = "Run the host directly in current console. Messages are read from stdin and answers written to stdout"
    )]
    Serve {},
    #[command(about = "Print the native messaging manifest registering the host with a browser")]
    Manifest {
        #[arg(
            long,
            required = true,
            help = "Extension allowed to use the host. chrome-extension://<id>/ for Chromium, the extension id for Firefox"
        )]
        origin: Vec<String>,
        #[arg(long, default_value_t = Browser::Chromium)]
        browser: Browser,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir.join("logs"), logging_level, args.log)?;
    let settings = Settings::load(&dir)?;

    match args.commands {
        Commands::Report { command } => {
            process_report_command(command, &open_ledger(&dir, &settings)?).await
        }
        Commands::Cleanup { retention } => {
            let retention = retention.unwrap_or(settings.retention_days);
            let removed = open_ledger(&dir, &settings)?.cleanup(retention).await?;
            println!("Removed {removed} records, keeping {retention}");
            Ok(())
        }
        Commands::Quota {} => {
            let ledger = open_ledger(&dir, &settings)?;
            let (quota, today) =
                futures::try_join!(ledger.quota(), ledger.query_by_date(ledger.today()))?;
            let level = match MonitorConfig::from(&settings).level(&quota) {
                QuotaLevel::Normal => "normal",
                QuotaLevel::Warning => "warning",
                QuotaLevel::Critical => "critical",
            };
            println!(
                "{} of {} bytes used ({}, {level})",
                quota.used, settings.storage_budget_bytes, quota.percentage
            );
            println!("{} domains recorded today", today.len());
            Ok(())
        }
        Commands::Serve {} => start_host(&dir, &settings).await,
        Commands::Manifest { origin, browser } => {
            let manifest = host_manifest(browser, to_host_path(env::current_exe()?), origin)?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            Ok(())
        }
    }
}

fn open_ledger(dir: &std::path::Path, settings: &Settings) -> Result<UsageLedger<FileUsageStore>> {
    let store = FileUsageStore::new(dir.join("records"))?;
    Ok(UsageLedger::from_settings(
        store,
        Arc::new(DefaultClock),
        settings,
    ))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::host::storage::entities::Retention;

    use super::{Args, Commands};

    #[test]
    fn test_cleanup_accepts_forever() {
        let args = Args::parse_from(["webtally", "cleanup", "--retention-days", "-1"]);
        assert!(matches!(
            args.commands,
            Commands::Cleanup {
                retention: Some(Retention::Forever)
            }
        ));

        let args = Args::parse_from(["webtally", "--dir", "/tmp/webtally", "cleanup"]);
        assert!(matches!(
            args.commands,
            Commands::Cleanup { retention: None }
        ));
        assert!(args.dir.is_some());

        assert!(Args::try_parse_from(["webtally", "cleanup", "--retention-days", "-5"]).is_err());
    }
}
