use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);

    /// Calendar day usage is attributed to. Days follow the user's local time zone.
    fn today(&self) -> NaiveDate {
        self.time().with_timezone(&Local).date_naive()
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
