use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::utils::clock::Clock;

use super::event::{HostEvent, SessionEvent};

pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically forces a flush of the open session, so a crash loses at most one period.
/// Checkpoints go through the session channel and are serialized with every other event.
pub struct CheckpointScheduler {
    next: mpsc::Sender<HostEvent>,
    period: Duration,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl CheckpointScheduler {
    pub fn new(
        next: mpsc::Sender<HostEvent>,
        period: Duration,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            next,
            period,
            clock,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut checkpoint = self.clock.instant();
        loop {
            checkpoint += self.period;
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(checkpoint) => ()
            }

            trace!("Sending checkpoint");
            if self.next.send(SessionEvent::Checkpoint.into()).await.is_err() {
                debug!("Session channel closed, stopping checkpoints");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio::{sync::mpsc, time::Instant};
    use tokio_util::sync::CancellationToken;

    use crate::{
        host::session::event::{HostEvent, SessionEvent},
        utils::clock::testing::ManualClock,
    };

    use super::CheckpointScheduler;

    #[tokio::test(start_paused = true)]
    async fn test_checkpoints_follow_the_period() -> Result<()> {
        let (next, mut events) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let scheduler = CheckpointScheduler::new(
            next,
            Duration::from_secs(60),
            ManualClock::new(),
            shutdown.clone(),
        );
        let handle = tokio::spawn(scheduler.run());

        let start = Instant::now();
        for _ in 0..3 {
            assert!(matches!(
                events.recv().await,
                Some(HostEvent::Session(SessionEvent::Checkpoint))
            ));
        }
        assert!(start.elapsed() >= Duration::from_secs(180));
        assert!(start.elapsed() < Duration::from_secs(240));

        shutdown.cancel();
        handle.await??;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_session_channel_closes() -> Result<()> {
        let (next, events) = mpsc::channel(4);
        drop(events);
        let scheduler = CheckpointScheduler::new(
            next,
            Duration::from_secs(1),
            ManualClock::new(),
            CancellationToken::new(),
        );
        scheduler.run().await?;
        Ok(())
    }
}
