use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use webtally::{
    host::{args::HostArgs, start_host},
    settings::Settings,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, HOST_PREFIX},
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    run(HostArgs::parse())
}

fn run(args: HostArgs) -> Result<()> {
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(HOST_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;
    info!("Launched with {:?}", args.launcher);

    let settings =
        Settings::load(&app_dir).inspect_err(|e| error!("Refusing to start with {e:?}"))?;

    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(start_host(&app_dir, &settings));
    // A stdin read still pending in the blocking pool never finishes on its own.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result.inspect_err(|e| error!("Host failed {e:?}"))
}
