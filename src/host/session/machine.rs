use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, trace};

use crate::{
    host::{
        collection::domain::extract_domain,
        monitor::alerts::ErrorSink,
        storage::{
            ledger::{AppendOutcome, UsageLedger},
            usage_store::UsageStore,
        },
    },
    utils::clock::Clock,
};

use super::event::{PageSignal, SessionEvent, TabId, Target};

/// The interval currently being measured.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub target: Target,
    pub domain: Arc<str>,
    pub started_at: DateTime<Utc>,
}

/// Exactly one of these holds at any time, so there is never more than one open session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    Active(ActiveSession),
    /// The user went idle on `resume`. Nothing is measured until they come back.
    Idle { resume: Target },
}

/// Converts browser lifecycle events into flushed usage intervals. Every flush goes through
/// [SessionMachine::end_session].
pub struct SessionMachine<S> {
    state: SessionState,
    /// Active tab of the focused window, whether it is trackable or not.
    focused: Option<Target>,
    window_focused: bool,
    /// Last url seen for every tab, used when activation events come without one.
    tabs: HashMap<TabId, Arc<str>>,
    ledger: Arc<UsageLedger<S>>,
    clock: Arc<dyn Clock>,
    errors: Arc<dyn ErrorSink>,
}

impl<S: UsageStore> SessionMachine<S> {
    pub fn new(ledger: Arc<UsageLedger<S>>, clock: Arc<dyn Clock>, errors: Arc<dyn ErrorSink>) -> Self {
        Self {
            state: SessionState::NoSession,
            focused: None,
            window_focused: true,
            tabs: HashMap::new(),
            ledger,
            clock,
            errors,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            SessionState::NoSession | SessionState::Idle { .. } => None,
        }
    }

    /// Ends the current session and opens one for `target` if its url is trackable.
    pub async fn start_session(&mut self, target: Target) {
        self.end_session().await;
        self.tabs.insert(target.tab_id, target.url.clone());
        self.focused = Some(target.clone());

        match extract_domain(&target.url) {
            Some(domain) => {
                debug!("Starting session for {domain} on {}", target.tab_id);
                self.state = SessionState::Active(ActiveSession {
                    target,
                    domain: domain.into(),
                    started_at: self.clock.time(),
                });
            }
            None => {
                debug!("Not tracking {} ({})", target.tab_id, target.url);
                self.state = SessionState::NoSession;
            }
        }
    }

    /// Flushes the open session, if any. The session is closed even when the flush fails: a lost
    /// interval is better than one counted twice. Returns the measured interval.
    pub async fn end_session(&mut self) -> Option<Duration> {
        let SessionState::Active(session) = &self.state else {
            return None;
        };
        let session = session.clone();
        self.state = SessionState::NoSession;

        let elapsed = (self.clock.time() - session.started_at).max(Duration::zero());
        match self.ledger.append(&session.domain, elapsed).await {
            Ok(AppendOutcome::Recorded(record)) => {
                info!(
                    "Recorded {}ms on {} ({}ms today)",
                    elapsed.num_milliseconds(),
                    session.domain,
                    record.time_spent_ms
                );
                self.errors.persistence_recovered();
            }
            Ok(AppendOutcome::Dropped) => {}
            Err(e) => {
                error!(
                    "Failed to flush {}ms on {}: {e:?}",
                    elapsed.num_milliseconds(),
                    session.domain
                );
                self.errors.persistence_failed(&e);
            }
        }
        Some(elapsed)
    }

    /// Idle time is never measured: going idle closes the session, coming back opens a new one on
    /// the tab the user left.
    pub async fn on_idle_change(&mut self, idle: bool) {
        match (idle, &self.state) {
            (true, SessionState::Active(session)) => {
                let resume = session.target.clone();
                self.end_session().await;
                debug!("User went idle on {}", resume.tab_id);
                self.state = SessionState::Idle { resume };
            }
            (true, SessionState::NoSession) => {
                if let Some(resume) = self.focused.clone() {
                    self.state = SessionState::Idle { resume };
                }
            }
            (false, SessionState::Idle { resume }) if self.window_focused => {
                let resume = resume.clone();
                debug!("User is back on {}", resume.tab_id);
                self.start_session(resume).await;
            }
            (true, SessionState::Idle { .. })
            | (false, SessionState::Idle { .. })
            | (false, SessionState::Active(_))
            | (false, SessionState::NoSession) => {}
        }
    }

    /// Forced flush that keeps tracking the same tab. Does nothing while idle or untracked.
    pub async fn checkpoint(&mut self) {
        let Some(session) = self.active_session() else {
            return;
        };
        let target = session.target.clone();
        trace!("Checkpoint on {}", target.tab_id);
        self.end_session().await;
        self.start_session(target).await;
    }

    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::TabActivated { tab_id, url } => {
                self.window_focused = true;
                match url.or_else(|| self.tabs.get(&tab_id).cloned()) {
                    Some(url) => self.start_session(Target { tab_id, url }).await,
                    None => {
                        debug!("Activated {tab_id} has no known url");
                        self.end_session().await;
                        self.state = SessionState::NoSession;
                        self.focused = None;
                    }
                }
            }
            SessionEvent::TabUpdated(target) => self.on_tab_updated(target).await,
            SessionEvent::TabRemoved(tab_id) => {
                self.end_session().await;
                self.tabs.remove(&tab_id);
                if matches!(&self.focused, Some(focused) if focused.tab_id == tab_id) {
                    self.focused = None;
                }
                if matches!(&self.state, SessionState::Idle { resume } if resume.tab_id == tab_id)
                {
                    self.state = SessionState::NoSession;
                }
            }
            SessionEvent::WindowFocusChanged { window_id, focused } => {
                self.end_session().await;
                match (window_id, focused) {
                    (Some(_), Some(target)) => {
                        self.window_focused = true;
                        self.start_session(target).await;
                    }
                    (Some(_), None) => {
                        self.window_focused = true;
                    }
                    (None, _) => {
                        debug!("No browser window has focus");
                        self.window_focused = false;
                        self.state = SessionState::NoSession;
                    }
                }
            }
            SessionEvent::Signal { sender, signal } => self.on_signal(sender, signal).await,
            SessionEvent::Checkpoint => self.checkpoint().await,
            SessionEvent::Shutdown => {
                self.end_session().await;
                self.state = SessionState::NoSession;
            }
        }
    }

    async fn on_tab_updated(&mut self, target: Target) {
        self.tabs.insert(target.tab_id, target.url.clone());
        let is_focused = matches!(&self.focused, Some(focused) if focused.tab_id == target.tab_id);
        if is_focused {
            self.focused = Some(target.clone());
        }

        match &mut self.state {
            SessionState::Active(session) if session.target.tab_id == target.tab_id => {
                if session.target.url != target.url {
                    self.start_session(target).await;
                }
            }
            SessionState::Idle { resume } if resume.tab_id == target.tab_id => {
                resume.url = target.url;
            }
            SessionState::NoSession if is_focused && self.window_focused => {
                self.start_session(target).await;
            }
            SessionState::Active(_) | SessionState::Idle { .. } | SessionState::NoSession => {}
        }
    }

    async fn on_signal(&mut self, sender: Option<Target>, signal: PageSignal) {
        let from_tracked_tab = match (&sender, &self.state) {
            (None, _) => true,
            (Some(sender), SessionState::Active(session)) => {
                sender.tab_id == session.target.tab_id
            }
            (Some(sender), SessionState::Idle { resume }) => sender.tab_id == resume.tab_id,
            (Some(_), SessionState::NoSession) => true,
        };

        match signal {
            PageSignal::UserActive if from_tracked_tab => self.on_idle_change(false).await,
            PageSignal::UserActive => {
                trace!("Ignoring activity of a tab the user did not leave idle");
            }
            PageSignal::UserInactive if from_tracked_tab => self.on_idle_change(true).await,
            PageSignal::UserInactive => {
                trace!("Ignoring inactivity of an untracked tab");
            }
            PageSignal::PageHidden | PageSignal::WindowBlur | PageSignal::PageUnload => {
                if from_tracked_tab {
                    self.end_session().await;
                }
            }
            PageSignal::PageVisible | PageSignal::WindowFocus => {
                let Some(sender) = sender else {
                    return;
                };
                self.window_focused = true;
                let already_tracked = matches!(
                    self.active_session(),
                    Some(session) if session.target.tab_id == sender.tab_id
                        && extract_domain(&sender.url).as_deref() == Some(&*session.domain)
                );
                if !already_tracked {
                    self.start_session(sender).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::anyhow;
    use chrono::Duration;

    use crate::{
        host::{
            monitor::alerts::{AlertClass, AlertLog, MockErrorSink},
            session::event::{PageSignal, SessionEvent, TabId, Target},
            storage::{
                entities::UsageRecord,
                ledger::{UsageLedger, DEFAULT_MIN_SESSION},
                usage_store::{testing::MemoryUsageStore, MockUsageStore},
            },
        },
        utils::{
            clock::{testing::ManualClock, Clock},
            logging::TEST_LOGGING,
        },
    };

    use super::{SessionMachine, SessionState};

    struct Harness {
        machine: SessionMachine<Arc<MemoryUsageStore>>,
        store: Arc<MemoryUsageStore>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            *TEST_LOGGING;
            let clock = ManualClock::new();
            let store = Arc::new(MemoryUsageStore::default());
            let ledger = Arc::new(UsageLedger::new(
                store.clone(),
                clock.clone(),
                DEFAULT_MIN_SESSION,
                1 << 20,
            ));
            let alerts = Arc::new(AlertLog::new(clock.clone()));
            Self {
                machine: SessionMachine::new(ledger, clock.clone(), alerts),
                store,
                clock,
            }
        }

        fn time_on(&self, domain: &str) -> Option<u64> {
            self.store
                .snapshot()
                .into_iter()
                .find(|record| record.domain == domain && record.date == self.clock.today())
                .map(|record| record.time_spent_ms)
        }

        fn assert_consistent(&self) {
            if let SessionState::Active(session) = self.machine.state() {
                assert_eq!(
                    crate::host::collection::domain::extract_domain(&session.target.url).as_deref(),
                    Some(&*session.domain)
                );
            }
        }
    }

    fn github(tab: i64) -> Target {
        Target::new(TabId(tab), "https://github.com/rust-lang/rust")
    }

    fn docs(tab: i64) -> Target {
        Target::new(TabId(tab), "https://docs.rs/tokio")
    }

    fn activated(target: Target) -> SessionEvent {
        SessionEvent::TabActivated {
            tab_id: target.tab_id,
            url: Some(target.url),
        }
    }

    fn signal(target: Target, signal: PageSignal) -> SessionEvent {
        SessionEvent::Signal {
            sender: Some(target),
            signal,
        }
    }

    #[tokio::test]
    async fn test_idle_flushes_elapsed_time() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(10_000);
        h.machine
            .handle(signal(github(1), PageSignal::UserInactive))
            .await;

        assert_eq!(h.time_on("github.com"), Some(10_000));
        assert_eq!(
            h.machine.state(),
            &SessionState::Idle { resume: github(1) }
        );
    }

    #[tokio::test]
    async fn test_idle_interval_is_never_counted() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(5_000);
        h.machine.on_idle_change(true).await;
        h.clock.advance(Duration::minutes(30));
        h.machine.on_idle_change(false).await;
        assert!(h.machine.active_session().is_some());
        h.clock.advance_ms(2_000);
        h.machine.end_session().await;

        assert_eq!(h.time_on("github.com"), Some(7_000));
    }

    #[tokio::test]
    async fn test_short_sessions_are_dropped() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(500);
        h.machine.handle(SessionEvent::TabRemoved(TabId(1))).await;

        assert!(h.store.snapshot().is_empty());
        assert_eq!(h.machine.state(), &SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_tab_switch_is_a_boundary() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(3_000);
        h.machine.handle(activated(docs(2))).await;
        h.clock.advance_ms(4_000);
        h.machine.handle(activated(github(1))).await;

        assert_eq!(h.time_on("github.com"), Some(3_000));
        assert_eq!(h.time_on("docs.rs"), Some(4_000));
        assert_eq!(h.machine.active_session().unwrap().target, github(1));
    }

    #[tokio::test]
    async fn test_navigation_within_tab_splits_by_domain() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(2_000);
        h.machine.handle(SessionEvent::TabUpdated(docs(1))).await;
        h.clock.advance_ms(1_500);
        h.machine.handle(SessionEvent::TabUpdated(docs(1))).await;
        h.clock.advance_ms(1_500);
        h.machine.end_session().await;

        assert_eq!(h.time_on("github.com"), Some(2_000));
        assert_eq!(h.time_on("docs.rs"), Some(3_000));
    }

    #[tokio::test]
    async fn test_untrackable_pages_pause_tracking() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(2_000);
        h.machine
            .handle(activated(Target::new(TabId(2), "chrome://newtab/")))
            .await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);
        h.clock.advance_ms(60_000);

        // The new tab navigates somewhere trackable.
        h.machine.handle(SessionEvent::TabUpdated(docs(2))).await;
        h.clock.advance_ms(1_000);
        h.machine.end_session().await;

        assert_eq!(h.time_on("github.com"), Some(2_000));
        assert_eq!(h.time_on("docs.rs"), Some(1_000));
    }

    #[tokio::test]
    async fn test_background_updates_do_not_start_sessions() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.machine.handle(SessionEvent::TabUpdated(docs(2))).await;
        assert_eq!(h.machine.active_session().unwrap().target, github(1));

        h.machine
            .handle(SessionEvent::WindowFocusChanged {
                window_id: None,
                focused: None,
            })
            .await;
        h.machine
            .handle(SessionEvent::TabUpdated(Target::new(
                TabId(1),
                "https://crates.io/",
            )))
            .await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_window_focus_changes() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(4_000);
        h.machine
            .handle(SessionEvent::WindowFocusChanged {
                window_id: None,
                focused: None,
            })
            .await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);
        h.clock.advance_ms(10_000);

        h.machine
            .handle(SessionEvent::WindowFocusChanged {
                window_id: Some(3),
                focused: Some(docs(5)),
            })
            .await;
        h.clock.advance_ms(2_000);
        h.machine.handle(SessionEvent::Shutdown).await;

        assert_eq!(h.time_on("github.com"), Some(4_000));
        assert_eq!(h.time_on("docs.rs"), Some(2_000));
        assert_eq!(h.machine.state(), &SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_boundary_signals_end_the_session() {
        for boundary in [
            PageSignal::PageHidden,
            PageSignal::WindowBlur,
            PageSignal::PageUnload,
        ] {
            let mut h = Harness::new();
            h.machine.handle(activated(github(1))).await;
            h.clock.advance_ms(1_500);
            // A background tab going away doesn't touch the tracked one.
            h.machine.handle(signal(docs(2), boundary)).await;
            assert!(h.machine.active_session().is_some());

            h.machine.handle(signal(github(1), boundary)).await;
            assert_eq!(h.machine.state(), &SessionState::NoSession);
            assert_eq!(h.time_on("github.com"), Some(1_500));
        }
    }

    #[tokio::test]
    async fn test_visibility_resumes_without_splitting() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(800);
        h.machine
            .handle(signal(github(1), PageSignal::PageVisible))
            .await;
        h.clock.advance_ms(800);
        h.machine.end_session().await;
        // One 1600ms session, not two dropped 800ms ones.
        assert_eq!(h.time_on("github.com"), Some(1_600));

        h.machine
            .handle(signal(docs(2), PageSignal::WindowFocus))
            .await;
        assert_eq!(h.machine.active_session().unwrap().target, docs(2));
    }

    #[tokio::test]
    async fn test_activity_without_window_focus_does_not_resume() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(2_000);
        h.machine
            .handle(signal(github(1), PageSignal::UserInactive))
            .await;
        h.machine
            .handle(SessionEvent::WindowFocusChanged {
                window_id: None,
                focused: None,
            })
            .await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);

        h.machine
            .handle(signal(github(1), PageSignal::UserActive))
            .await;
        h.clock.advance_ms(20_000);
        h.machine.handle(SessionEvent::Checkpoint).await;

        assert_eq!(h.machine.state(), &SessionState::NoSession);
        assert_eq!(h.time_on("github.com"), Some(2_000));
    }

    #[tokio::test]
    async fn test_activity_of_other_tabs_does_not_resume() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.machine.on_idle_change(true).await;
        h.machine
            .handle(signal(docs(2), PageSignal::UserActive))
            .await;
        assert_eq!(
            h.machine.state(),
            &SessionState::Idle { resume: github(1) }
        );

        h.machine
            .handle(signal(github(1), PageSignal::UserActive))
            .await;
        assert_eq!(h.machine.active_session().unwrap().target, github(1));
    }

    #[tokio::test]
    async fn test_inactivity_of_other_tabs_is_ignored() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.machine
            .handle(signal(docs(2), PageSignal::UserInactive))
            .await;
        assert!(h.machine.active_session().is_some());
    }

    #[tokio::test]
    async fn test_checkpoint_keeps_tracking() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(60_000);
        h.machine.handle(SessionEvent::Checkpoint).await;
        assert_eq!(h.time_on("github.com"), Some(60_000));

        let session = h.machine.active_session().unwrap();
        assert_eq!(session.target, github(1));
        assert_eq!(session.started_at, h.clock.time());

        h.clock.advance_ms(30_000);
        h.machine.handle(SessionEvent::Checkpoint).await;
        assert_eq!(h.time_on("github.com"), Some(90_000));
    }

    #[tokio::test]
    async fn test_checkpoint_while_idle_does_nothing() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.clock.advance_ms(2_000);
        h.machine.on_idle_change(true).await;
        h.clock.advance_ms(60_000);
        h.machine.handle(SessionEvent::Checkpoint).await;

        assert_eq!(h.time_on("github.com"), Some(2_000));
        assert!(matches!(h.machine.state(), SessionState::Idle { .. }));
    }

    #[tokio::test]
    async fn test_removing_idle_tab_forgets_it() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.machine.on_idle_change(true).await;
        h.machine.handle(SessionEvent::TabRemoved(TabId(1))).await;
        h.machine.on_idle_change(false).await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_idle_tab_resumes_on_its_latest_url() {
        let mut h = Harness::new();
        h.machine.handle(activated(github(1))).await;
        h.machine.on_idle_change(true).await;
        h.machine.handle(SessionEvent::TabUpdated(docs(1))).await;
        h.machine
            .handle(signal(docs(1), PageSignal::UserActive))
            .await;
        assert_eq!(&*h.machine.active_session().unwrap().domain, "docs.rs");
    }

    #[tokio::test]
    async fn test_activation_without_url_uses_known_url() {
        let mut h = Harness::new();
        h.machine.handle(SessionEvent::TabUpdated(docs(4))).await;
        h.machine
            .handle(SessionEvent::TabActivated {
                tab_id: TabId(4),
                url: None,
            })
            .await;
        assert_eq!(h.machine.active_session().unwrap().target, docs(4));

        h.machine
            .handle(SessionEvent::TabActivated {
                tab_id: TabId(9),
                url: None,
            })
            .await;
        assert_eq!(h.machine.state(), &SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_event_sequences_keep_state_consistent() {
        let mut h = Harness::new();
        let events = vec![
            activated(github(1)),
            signal(github(1), PageSignal::UserInactive),
            activated(docs(2)),
            SessionEvent::TabUpdated(github(2)),
            signal(github(2), PageSignal::UserActive),
            SessionEvent::Checkpoint,
            SessionEvent::TabRemoved(TabId(1)),
            signal(github(2), PageSignal::PageHidden),
            signal(github(2), PageSignal::PageVisible),
            SessionEvent::WindowFocusChanged {
                window_id: None,
                focused: None,
            },
            signal(docs(3), PageSignal::UserActive),
            SessionEvent::Shutdown,
        ];
        for event in events {
            h.clock.advance_ms(1_250);
            h.machine.handle(event).await;
            h.assert_consistent();
        }
        assert_eq!(h.machine.state(), &SessionState::NoSession);

        let total: u64 = h
            .store
            .snapshot()
            .iter()
            .map(|record: &UsageRecord| record.time_spent_ms)
            .sum();
        // Time is only counted while a session is open, so it never exceeds wall time.
        assert!(total <= 12 * 1_250);
    }

    #[tokio::test]
    async fn test_failed_flush_still_closes_session() {
        let clock = ManualClock::new();
        let mut store = MockUsageStore::new();
        store
            .expect_increment()
            .times(1)
            .returning(|_, _, _| Err(anyhow!("disk full")));
        let ledger = Arc::new(UsageLedger::new(
            store,
            clock.clone(),
            DEFAULT_MIN_SESSION,
            1 << 20,
        ));
        let mut sink = MockErrorSink::new();
        sink.expect_persistence_failed().times(1).return_const(());
        sink.expect_persistence_recovered().never();
        let mut machine = SessionMachine::new(ledger, clock.clone(), Arc::new(sink));

        machine.handle(activated(github(1))).await;
        clock.advance_ms(5_000);
        machine.handle(activated(docs(2))).await;

        assert_eq!(machine.active_session().unwrap().target, docs(2));
        assert_eq!(machine.active_session().unwrap().started_at, clock.time());
    }

    #[tokio::test]
    async fn test_failed_flush_raises_alert() {
        let clock = ManualClock::new();
        let mut store = MockUsageStore::new();
        store
            .expect_increment()
            .returning(|_, _, _| Err(anyhow!("disk full")));
        let ledger = Arc::new(UsageLedger::new(
            store,
            clock.clone(),
            DEFAULT_MIN_SESSION,
            1 << 20,
        ));
        let alerts = Arc::new(AlertLog::new(clock.clone()));
        let mut machine = SessionMachine::new(ledger, clock.clone(), alerts.clone());

        machine.handle(activated(github(1))).await;
        clock.advance_ms(5_000);
        machine.handle(SessionEvent::TabRemoved(TabId(1))).await;

        let active = alerts.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].class, AlertClass::PersistenceFailure);
        assert_eq!(machine.state(), &SessionState::NoSession);
    }
}
