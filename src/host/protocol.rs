use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::{
    collection::activity::{PageInput, PageObservation},
    requests::{Request, RequestKind},
    session::event::{PageSignal, SessionEvent, TabId, Target},
    storage::entities::Retention,
};

/// Page a signal originates from. Both parts are needed to act on the page.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub tab_id: Option<TabId>,
    pub url: Option<String>,
}

impl Sender {
    fn into_target(self) -> Option<Target> {
        Some(Target::new(self.tab_id?, self.url?))
    }
}

/// Every message the extension sends to the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    TabActivated {
        tab_id: TabId,
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        url: String,
    },
    TabRemoved {
        tab_id: TabId,
    },
    /// `window_id` is absent or null when no browser window has focus.
    WindowFocusChanged {
        window_id: Option<i64>,
        tab_id: Option<TabId>,
        url: Option<String>,
    },
    UserActive(Sender),
    UserInactive(Sender),
    PageHidden(Sender),
    WindowBlur(Sender),
    PageUnload(Sender),
    PageVisible(Sender),
    WindowFocus(Sender),
    PageInput {
        tab_id: TabId,
        url: String,
        input: PageInput,
    },
    FetchTodaySessions {
        request_id: Option<Value>,
    },
    FetchUsage {
        request_id: Option<Value>,
        date: NaiveDate,
    },
    FetchStorageStatus {
        request_id: Option<Value>,
    },
    RunCleanup {
        request_id: Option<Value>,
        retention_days: Option<Retention>,
    },
    DeleteUsage {
        request_id: Option<Value>,
        domain: Option<String>,
    },
    DismissAlert {
        request_id: Option<Value>,
        alert_id: u64,
    },
}

/// Where a decoded message has to go.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Session(SessionEvent),
    Page(PageObservation),
    Request(Request),
}

impl From<InboundMessage> for Inbound {
    fn from(message: InboundMessage) -> Self {
        let signal = |sender: Sender, signal| {
            Inbound::Session(SessionEvent::Signal {
                sender: sender.into_target(),
                signal,
            })
        };
        let request = |request_id, kind| Inbound::Request(Request { request_id, kind });

        match message {
            InboundMessage::TabActivated { tab_id, url } => {
                Inbound::Session(SessionEvent::TabActivated {
                    tab_id,
                    url: url.map(Arc::from),
                })
            }
            InboundMessage::TabUpdated { tab_id, url } => {
                Inbound::Session(SessionEvent::TabUpdated(Target::new(tab_id, url)))
            }
            InboundMessage::TabRemoved { tab_id } => {
                Inbound::Session(SessionEvent::TabRemoved(tab_id))
            }
            InboundMessage::WindowFocusChanged {
                window_id,
                tab_id,
                url,
            } => Inbound::Session(SessionEvent::WindowFocusChanged {
                window_id,
                focused: Sender { tab_id, url }.into_target(),
            }),
            InboundMessage::UserActive(sender) => signal(sender, PageSignal::UserActive),
            InboundMessage::UserInactive(sender) => signal(sender, PageSignal::UserInactive),
            InboundMessage::PageHidden(sender) => signal(sender, PageSignal::PageHidden),
            InboundMessage::WindowBlur(sender) => signal(sender, PageSignal::WindowBlur),
            InboundMessage::PageUnload(sender) => signal(sender, PageSignal::PageUnload),
            InboundMessage::PageVisible(sender) => signal(sender, PageSignal::PageVisible),
            InboundMessage::WindowFocus(sender) => signal(sender, PageSignal::WindowFocus),
            InboundMessage::PageInput { tab_id, url, input } => Inbound::Page(PageObservation {
                target: Target::new(tab_id, url),
                input,
            }),
            InboundMessage::FetchTodaySessions { request_id } => {
                request(request_id, RequestKind::FetchTodaySessions)
            }
            InboundMessage::FetchUsage { request_id, date } => {
                request(request_id, RequestKind::FetchUsage { date })
            }
            InboundMessage::FetchStorageStatus { request_id } => {
                request(request_id, RequestKind::FetchStorageStatus)
            }
            InboundMessage::RunCleanup {
                request_id,
                retention_days,
            } => request(
                request_id,
                RequestKind::RunCleanup {
                    retention: retention_days,
                },
            ),
            InboundMessage::DeleteUsage { request_id, domain } => {
                request(request_id, RequestKind::DeleteUsage { domain })
            }
            InboundMessage::DismissAlert {
                request_id,
                alert_id,
            } => request(request_id, RequestKind::DismissAlert { alert_id }),
        }
    }
}

/// Decodes one message payload.
pub fn decode(payload: &[u8]) -> serde_json::Result<Inbound> {
    serde_json::from_slice::<InboundMessage>(payload).map(Inbound::from)
}

/// Salvages the `requestId` of a payload [`decode`] refused, so the caller still gets an answer.
/// Payloads that are not JSON objects or carry no id have nobody waiting on them.
pub fn rejected_request(payload: &[u8], error: &serde_json::Error) -> Option<Request> {
    let Value::Object(mut fields) = serde_json::from_slice::<Value>(payload).ok()? else {
        return None;
    };
    let request_id = fields.remove("requestId").filter(|id| !id.is_null())?;
    Some(Request {
        request_id: Some(request_id),
        kind: RequestKind::Rejected {
            reason: error.to_string(),
        },
    })
}
