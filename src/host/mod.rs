use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use collection::activity::{ActivityMonitor, PageObservation};
use dispatch::Dispatcher;
use monitor::{alerts::AlertLog, MonitorConfig, StorageMonitor};
use native_messaging::{write_message, MAX_OUTBOUND_SIZE};
use requests::{Request, RequestHandler, Response};
use session::{
    checkpoint::CheckpointScheduler, event::HostEvent, machine::SessionMachine, SessionModule,
};
use storage::{ledger::UsageLedger, usage_store::FileUsageStore};
use tokio::{
    io::{self, AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    settings::Settings,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod dispatch;
pub mod monitor;
pub mod native_messaging;
pub mod protocol;
pub mod requests;
pub mod session;
pub mod shutdown;
pub mod storage;

const CHANNEL_CAPACITY: usize = 64;

/// Represents the starting point for the host. Talks to the browser over stdin and stdout until
/// the browser closes the pipe or the process is interrupted.
pub async fn start_host(dir: &Path, settings: &Settings) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let (_, result) = tokio::join!(shutdown::detect_shutdown(shutdown_token.clone()), async {
        let result = run_host(
            io::stdin(),
            io::stdout(),
            dir,
            settings,
            Arc::new(DefaultClock),
            shutdown_token.clone(),
        )
        .await;
        shutdown_token.cancel();
        result
    });
    result
}

/// Wires every module of the host together and runs them until the reader ends.
pub async fn run_host(
    reader: impl AsyncRead + Unpin,
    writer: impl AsyncWrite + Unpin,
    dir: &Path,
    settings: &Settings,
    clock: Arc<dyn Clock>,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let store = FileUsageStore::new(dir.join("records")).context("Failed to open the record directory")?;
    let ledger = Arc::new(UsageLedger::from_settings(store, clock.clone(), settings));
    let alerts = Arc::new(AlertLog::new(clock.clone()));
    let storage_monitor = Arc::new(StorageMonitor::new(
        ledger.clone(),
        alerts.clone(),
        clock.clone(),
        MonitorConfig::from(settings),
    ));

    let (event_sender, event_receiver) = mpsc::channel::<HostEvent>(CHANNEL_CAPACITY);
    let (observation_sender, observation_receiver) =
        mpsc::channel::<PageObservation>(CHANNEL_CAPACITY);
    let (request_sender, request_receiver) = mpsc::channel::<Request>(CHANNEL_CAPACITY);
    let (response_sender, response_receiver) = mpsc::channel::<Response>(CHANNEL_CAPACITY);

    let dispatcher = Dispatcher::new(
        reader,
        event_sender.clone(),
        observation_sender,
        shutdown_token.clone(),
    );
    let activity = ActivityMonitor::new(
        observation_receiver,
        event_sender.clone(),
        settings.inactivity_timeout(),
        shutdown_token.clone(),
    );
    let checkpoints = CheckpointScheduler::new(
        event_sender,
        settings.checkpoint_interval(),
        clock.clone(),
        shutdown_token.clone(),
    );
    let session = SessionModule::new(
        event_receiver,
        SessionMachine::new(ledger.clone(), clock, alerts.clone()),
        request_sender,
    );
    let requests = RequestHandler::new(
        request_receiver,
        ledger,
        storage_monitor.clone(),
        alerts,
        settings.retention_days,
        response_sender,
    );

    info!("Host started");
    let (
        dispatch_result,
        activity_result,
        checkpoint_result,
        monitor_result,
        session_result,
        request_result,
        response_result,
    ) = tokio::join!(
        dispatcher.run(),
        activity.run(),
        checkpoints.run(),
        storage_monitor.run(shutdown_token.clone()),
        session.run(),
        requests.run(),
        write_responses(writer, response_receiver, &shutdown_token),
    );

    for (module, result) in [
        ("Dispatch", dispatch_result),
        ("Activity", activity_result),
        ("Checkpoint", checkpoint_result),
        ("Storage monitor", monitor_result),
        ("Session", session_result),
        ("Request", request_result),
        ("Response", response_result),
    ] {
        if let Err(e) = result {
            error!("{module} module got an error {e:?}");
        }
    }
    info!("Host stopped");

    Ok(())
}

/// Serializes responses back to the browser. A response that is too large for the browser is
/// replaced by an error so the caller still gets an answer.
async fn write_responses(
    mut writer: impl AsyncWrite + Unpin,
    mut responses: mpsc::Receiver<Response>,
    shutdown_token: &CancellationToken,
) -> Result<()> {
    while let Some(response) = responses.recv().await {
        let mut payload = serde_json::to_vec(&response)?;
        if payload.len() > MAX_OUTBOUND_SIZE {
            warn!("Response of {} bytes is too large", payload.len());
            payload = serde_json::to_vec(&Response::error(
                response.request_id,
                "Response is too large",
            ))?;
        }

        if let Err(e) = write_message(&mut writer, &payload).await {
            shutdown_token.cancel();
            return Err(e.context("Failed to answer the browser"));
        }
    }
    Ok(())
}
