//! Queries and commands issued by the dashboard. They are answered one at a time, in the order
//! they left the session channel.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info_span, warn, Instrument};

use super::{
    monitor::{alerts::AlertLog, CleanupTrigger, StorageMonitor},
    storage::{entities::Retention, ledger::UsageLedger, usage_store::UsageStore},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Echoed back verbatim so the caller can match answers to questions.
    pub request_id: Option<Value>,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    FetchTodaySessions,
    FetchUsage { date: NaiveDate },
    FetchStorageStatus,
    /// `None` uses the configured retention.
    RunCleanup { retention: Option<Retention> },
    /// `None` deletes everything.
    DeleteUsage { domain: Option<String> },
    DismissAlert { alert_id: u64 },
    /// Carried a `requestId` but could not be decoded. Answered with the decoding error.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    Data(Value),
    Error(String),
}

/// Either `{requestId?, data}` or `{requestId?, error}`. An error is never confused with an empty
/// result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl Response {
    pub fn data(request_id: Option<Value>, data: Value) -> Self {
        Self {
            request_id,
            body: ResponseBody::Data(data),
        }
    }

    pub fn error(request_id: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            request_id,
            body: ResponseBody::Error(message.into()),
        }
    }
}

pub struct RequestHandler<S> {
    requests: mpsc::Receiver<Request>,
    ledger: Arc<UsageLedger<S>>,
    monitor: Arc<StorageMonitor<S>>,
    alerts: Arc<AlertLog>,
    retention: Retention,
    responses: mpsc::Sender<Response>,
}

impl<S: UsageStore> RequestHandler<S> {
    pub fn new(
        requests: mpsc::Receiver<Request>,
        ledger: Arc<UsageLedger<S>>,
        monitor: Arc<StorageMonitor<S>>,
        alerts: Arc<AlertLog>,
        retention: Retention,
        responses: mpsc::Sender<Response>,
    ) -> Self {
        Self {
            requests,
            ledger,
            monitor,
            alerts,
            retention,
            responses,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(request) = self.requests.recv().await {
            let span = info_span!("Answering request", id = ?request.request_id);
            let response = self.answer(request).instrument(span).await;
            if self.responses.send(response).await.is_err() {
                warn!("Response channel closed, stopping request handler");
                break;
            }
        }
        Ok(())
    }

    pub async fn answer(&self, Request { request_id, kind }: Request) -> Response {
        debug!("Executing {kind:?}");
        match self.execute(kind).await {
            Ok(data) => Response::data(request_id, data),
            Err(e) => {
                error!("Request failed {e:?}");
                Response::error(request_id, format!("{e:#}"))
            }
        }
    }

    async fn execute(&self, kind: RequestKind) -> Result<Value> {
        let data = match kind {
            RequestKind::FetchTodaySessions => {
                serde_json::to_value(self.ledger.query_by_date(self.ledger.today()).await?)?
            }
            RequestKind::FetchUsage { date } => {
                serde_json::to_value(self.ledger.query_by_date(date).await?)?
            }
            RequestKind::FetchStorageStatus => serde_json::to_value(self.monitor.status().await?)?,
            RequestKind::RunCleanup { retention } => {
                let removed = self
                    .monitor
                    .cleanup(retention.unwrap_or(self.retention), CleanupTrigger::Manual)
                    .await?;
                json!({ "removed": removed })
            }
            RequestKind::DeleteUsage { domain } => {
                let removed = self.ledger.delete(domain.as_deref()).await?;
                json!({ "removed": removed })
            }
            RequestKind::DismissAlert { alert_id } => {
                json!({ "dismissed": self.alerts.dismiss(alert_id) })
            }
            RequestKind::Rejected { reason } => bail!("Invalid request: {reason}"),
        };
        Ok(data)
    }
}
