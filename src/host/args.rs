use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "webtally-host", version, about = "Native messaging host of webtally")]
pub struct HostArgs {
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Mirrors logs to stderr. Stdout is reserved for the browser.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Passed by Chrome on Windows.
    #[arg(long = "parent-window")]
    pub parent_window: Option<String>,
    /// Caller origin (Chrome) or manifest path and extension id (Firefox). Only logged.
    #[arg()]
    pub launcher: Vec<String>,
}
