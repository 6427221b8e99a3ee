//! Idle detection for pages. Every page context gets an [ActivityTracker]; the
//! [ActivityMonitor] owns them all and keeps at most one pending inactivity timeout per page.

use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use serde::Deserialize;
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::StreamExt;
use tokio_util::{
    sync::CancellationToken,
    time::{delay_queue, DelayQueue},
};
use tracing::{debug, trace};

use crate::host::session::event::{HostEvent, PageSignal, SessionEvent, TabId, Target};

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw observations a page reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageInput {
    Pointer,
    Keyboard,
    Scroll,
    Click,
    /// Visibility changed to visible.
    Visible,
    /// Visibility changed to hidden.
    Hidden,
    Focus,
    Blur,
    Unload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Rearm,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub signals: Vec<PageSignal>,
    pub timer: TimerAction,
}

/// Edge detection for a single page. Emits `UserActive` once per idle to active edge and
/// `UserInactive` once per active to idle edge.
#[derive(Debug)]
pub struct ActivityTracker {
    last_active: Instant,
    idle: bool,
}

impl ActivityTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            last_active: now,
            idle: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    pub fn observe(&mut self, input: PageInput, now: Instant) -> Observation {
        match input {
            PageInput::Pointer | PageInput::Keyboard | PageInput::Scroll | PageInput::Click => {
                Observation {
                    signals: self.activity(now).into_iter().collect(),
                    timer: TimerAction::Rearm,
                }
            }
            PageInput::Visible | PageInput::Focus => {
                let boundary = if input == PageInput::Visible {
                    PageSignal::PageVisible
                } else {
                    PageSignal::WindowFocus
                };
                Observation {
                    signals: self.activity(now).into_iter().chain([boundary]).collect(),
                    timer: TimerAction::Rearm,
                }
            }
            PageInput::Hidden | PageInput::Blur | PageInput::Unload => {
                let boundary = match input {
                    PageInput::Hidden => PageSignal::PageHidden,
                    PageInput::Blur => PageSignal::WindowBlur,
                    _ => PageSignal::PageUnload,
                };
                Observation {
                    signals: vec![boundary],
                    timer: TimerAction::Cancel,
                }
            }
        }
    }

    /// The inactivity timeout elapsed without any input.
    pub fn expire(&mut self) -> Option<PageSignal> {
        if self.idle {
            return None;
        }
        self.idle = true;
        Some(PageSignal::UserInactive)
    }

    fn activity(&mut self, now: Instant) -> Option<PageSignal> {
        self.last_active = now;
        if self.idle {
            self.idle = false;
            Some(PageSignal::UserActive)
        } else {
            None
        }
    }
}

/// A raw observation coming from a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageObservation {
    pub target: Target,
    pub input: PageInput,
}

struct PageContext {
    target: Target,
    tracker: ActivityTracker,
    timer: Option<delay_queue::Key>,
}

/// Turns page observations into [PageSignal]s for the session module.
pub struct ActivityMonitor {
    inputs: mpsc::Receiver<PageObservation>,
    next: mpsc::Sender<HostEvent>,
    pages: HashMap<TabId, PageContext>,
    timers: DelayQueue<TabId>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl ActivityMonitor {
    pub fn new(
        inputs: mpsc::Receiver<PageObservation>,
        next: mpsc::Sender<HostEvent>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inputs,
            next,
            pages: HashMap::new(),
            timers: DelayQueue::new(),
            timeout,
            shutdown,
        }
    }

    /// Executes the monitor event loop.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                observation = self.inputs.recv() => {
                    let Some(observation) = observation else {
                        return Ok(())
                    };
                    self.observe(observation).await?;
                }
                Some(expired) = self.timers.next() => {
                    self.expire(expired.into_inner()).await?;
                }
            }
        }
    }

    async fn observe(&mut self, PageObservation { target, input }: PageObservation) -> Result<()> {
        trace!("{input:?} on {}", target.tab_id);
        let now = Instant::now();
        let tab_id = target.tab_id;
        let page = self.pages.entry(tab_id).or_insert_with(|| PageContext {
            target: target.clone(),
            tracker: ActivityTracker::new(now),
            timer: None,
        });
        page.target = target;

        let observation = page.tracker.observe(input, now);
        match (observation.timer, page.timer.take()) {
            (TimerAction::Rearm, Some(key)) => {
                // Replacing the deadline in place keeps a single pending timeout per page.
                self.timers.reset(&key, self.timeout);
                page.timer = Some(key);
            }
            (TimerAction::Rearm, None) => {
                page.timer = Some(self.timers.insert(tab_id, self.timeout));
            }
            (TimerAction::Cancel, Some(key)) => {
                self.timers.remove(&key);
            }
            (TimerAction::Cancel, None) => {}
        }

        let sender = page.target.clone();
        if input == PageInput::Unload {
            self.pages.remove(&tab_id);
        }
        for signal in observation.signals {
            self.emit(sender.clone(), signal).await?;
        }
        Ok(())
    }

    async fn expire(&mut self, tab_id: TabId) -> Result<()> {
        let Some(page) = self.pages.get_mut(&tab_id) else {
            return Ok(());
        };
        page.timer = None;
        if let Some(signal) = page.tracker.expire() {
            debug!("{tab_id} became inactive");
            let sender = page.target.clone();
            self.emit(sender, signal).await?;
        }
        Ok(())
    }

    async fn emit(&self, sender: Target, signal: PageSignal) -> Result<()> {
        self.next
            .send(
                SessionEvent::Signal {
                    sender: Some(sender),
                    signal,
                }
                .into(),
            )
            .await?;
        Ok(())
    }
}
