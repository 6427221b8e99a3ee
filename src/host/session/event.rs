use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::host::requests::Request;

/// Browser handle of a tab. Only ever compared, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab {}", self.0)
    }
}

/// A tab together with the url it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub tab_id: TabId,
    pub url: Arc<str>,
}

impl Target {
    pub fn new(tab_id: TabId, url: impl Into<Arc<str>>) -> Self {
        Self {
            tab_id,
            url: url.into(),
        }
    }
}

/// Signals emitted on behalf of a page, either by the extension or by
/// [ActivityMonitor](crate::host::collection::activity::ActivityMonitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    UserActive,
    UserInactive,
    PageHidden,
    WindowBlur,
    PageUnload,
    PageVisible,
    WindowFocus,
}

/// Everything the session state machine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `url` is absent when the browser didn't report it; the last url seen for the tab is used.
    TabActivated {
        tab_id: TabId,
        url: Option<Arc<str>>,
    },
    TabUpdated(Target),
    TabRemoved(TabId),
    /// Focus moved to another browser window, or away from the browser when `focused` is `None`.
    /// `focused` carries the active tab of the newly focused window when known.
    WindowFocusChanged {
        window_id: Option<i64>,
        focused: Option<Target>,
    },
    Signal {
        sender: Option<Target>,
        signal: PageSignal,
    },
    Checkpoint,
    Shutdown,
}

/// Items of the single channel the session module consumes. Requests travel through it so they
/// observe every event received before them.
#[derive(Debug)]
pub enum HostEvent {
    Session(SessionEvent),
    Request(Request),
}

impl From<SessionEvent> for HostEvent {
    fn from(value: SessionEvent) -> Self {
        HostEvent::Session(value)
    }
}
