use anyhow::Result;
use event::{HostEvent, SessionEvent};
use machine::SessionMachine;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::host::{requests::Request, storage::usage_store::UsageStore};

pub mod checkpoint;
pub mod event;
pub mod machine;

/// Sole owner of the session state. Receives every event through one channel and handles them
/// in order, each one completing (store write included) before the next is looked at.
///
/// Requests are passed on to the request handler in the position they arrived in, so an answer
/// always reflects every event received before the request.
pub struct SessionModule<S> {
    receiver: mpsc::Receiver<HostEvent>,
    machine: SessionMachine<S>,
    requests: mpsc::Sender<Request>,
}

impl<S: UsageStore> SessionModule<S> {
    pub fn new(
        receiver: mpsc::Receiver<HostEvent>,
        machine: SessionMachine<S>,
        requests: mpsc::Sender<Request>,
    ) -> Self {
        Self {
            receiver,
            machine,
            requests,
        }
    }

    /// Runs until every event sender is gone, then flushes the open session.
    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            match event {
                HostEvent::Session(event) => {
                    debug!("Processing event {:?}", event);
                    self.machine.handle(event).await;
                }
                HostEvent::Request(request) => {
                    if let Err(e) = self.requests.send(request).await {
                        error!("Request handler is gone, dropping {:?}", e.0);
                    }
                }
            }
        }

        self.receiver.close();
        info!("Event channel closed, flushing the open session");
        self.machine.handle(SessionEvent::Shutdown).await;
        Ok(())
    }
}
