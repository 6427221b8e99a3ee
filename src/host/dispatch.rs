use anyhow::Result;
use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    collection::activity::PageObservation,
    native_messaging::{read_message, Frame},
    protocol::{decode, rejected_request, Inbound},
    session::event::HostEvent,
};

/// Reads messages from the extension and routes them. Page observations go to the activity
/// monitor, everything else to the session module.
///
/// The browser closing the pipe is how the host learns it has to stop, so the shutdown token is
/// cancelled however the reader ends.
pub struct Dispatcher<R> {
    reader: R,
    events: mpsc::Sender<HostEvent>,
    observations: mpsc::Sender<PageObservation>,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> Dispatcher<R> {
    pub fn new(
        reader: R,
        events: mpsc::Sender<HostEvent>,
        observations: mpsc::Sender<PageObservation>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reader,
            events,
            observations,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let result = self.read_loop().await;
        self.shutdown.cancel();
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                frame = read_message(&mut self.reader) => frame?,
            };

            let payload = match frame {
                Some(Frame::Message(payload)) => payload,
                Some(Frame::Oversized(length)) => {
                    warn!("Skipped a {length} byte message");
                    continue;
                }
                None => {
                    info!("Browser closed the connection");
                    return Ok(());
                }
            };

            let inbound = match decode(&payload) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(
                        "Skipping undecodable message {:?}: {e}",
                        String::from_utf8_lossy(&payload)
                    );
                    match rejected_request(&payload, &e) {
                        Some(request) => Inbound::Request(request),
                        None => continue,
                    }
                }
            };

            debug!("Received {inbound:?}");
            let sent = match inbound {
                Inbound::Session(event) => self.events.send(event.into()).await.is_ok(),
                Inbound::Request(request) => {
                    self.events.send(HostEvent::Request(request)).await.is_ok()
                }
                Inbound::Page(observation) => self.observations.send(observation).await.is_ok(),
            };
            if !sent {
                error!("Processing side of the host is gone, stopping the reader");
                return Ok(());
            }
        }
    }
}
