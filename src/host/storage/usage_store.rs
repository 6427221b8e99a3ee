use std::{
    collections::BTreeMap,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use super::entities::{parse_record_key, record_key, UsageRecord};

pub const USAGE_FILE_NAME: &str = "usage.json";
const LOCK_FILE_NAME: &str = "usage.lock";

/// Keyed collection of [UsageRecord]s. Implementations must make every mutation an atomic
/// read-modify-write: two increments of the same key never lose an update.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageStore: Send + Sync + 'static {
    /// Adds `delta_ms` to the record of `(domain, date)`, creating it when absent. Returns the
    /// updated record.
    async fn increment(&self, domain: &str, date: NaiveDate, delta_ms: u64) -> Result<UsageRecord>;

    async fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>>;

    /// Removes every record dated strictly before `cutoff`.
    async fn remove_older_than(&self, cutoff: NaiveDate) -> Result<usize>;

    async fn remove_domain(&self, domain: &str) -> Result<usize>;

    async fn clear(&self) -> Result<usize>;

    /// Bytes the persisted records currently occupy.
    async fn bytes_used(&self) -> Result<u64>;
}

#[async_trait]
impl<T> UsageStore for T
where
    T: Deref + Send + Sync + 'static,
    T::Target: UsageStore,
{
    async fn increment(&self, domain: &str, date: NaiveDate, delta_ms: u64) -> Result<UsageRecord> {
        self.deref().increment(domain, date, delta_ms).await
    }

    async fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>> {
        self.deref().records_for(date).await
    }

    async fn remove_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        self.deref().remove_older_than(cutoff).await
    }

    async fn remove_domain(&self, domain: &str) -> Result<usize> {
        self.deref().remove_domain(domain).await
    }

    async fn clear(&self) -> Result<usize> {
        self.deref().clear().await
    }

    async fn bytes_used(&self) -> Result<u64> {
        self.deref().bytes_used().await
    }
}

type UsageMap = BTreeMap<String, UsageRecord>;

/// The main realization of [UsageStore]: a single JSON object mapping record keys to records.
///
/// Every operation takes an in-process mutex and an exclusive lock on a sidecar lock file, so a
/// host and a cli touching the same directory never interleave. Writes go to a temporary file
/// that is renamed over the previous one, which keeps the old content intact if the process
/// dies mid-write.
pub struct FileUsageStore {
    record_dir: PathBuf,
    guard: Mutex<()>,
}

impl FileUsageStore {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self {
            record_dir,
            guard: Mutex::new(()),
        })
    }

    pub fn usage_path(&self) -> PathBuf {
        self.record_dir.join(USAGE_FILE_NAME)
    }

    async fn open_lock(&self) -> Result<File> {
        let lock = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.record_dir.join(LOCK_FILE_NAME))
            .await?;
        Ok(lock)
    }

    /// Runs `operation` over the current records and persists the result if it reports a change.
    async fn modify<T>(&self, operation: impl FnOnce(&mut UsageMap) -> (T, bool)) -> Result<T> {
        let _guard = self.guard.lock().await;
        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;

        let result: Result<T> = async {
            let path = self.usage_path();
            let mut records = read_records(&path).await?;
            let (value, changed) = operation(&mut records);
            if changed {
                write_records(&path, &records).await?;
            }
            Ok(value)
        }
        .await;

        lock.unlock_async().await?;
        result
    }

    async fn read(&self) -> Result<UsageMap> {
        let _guard = self.guard.lock().await;
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = read_records(&self.usage_path()).await;
        lock.unlock_async().await?;
        result
    }
}

async fn read_records(path: &Path) -> Result<UsageMap> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UsageMap::new()),
        Err(e) => return Err(e).with_context(|| format!("Can't read {path:?}")),
    };
    if content.is_empty() {
        return Ok(UsageMap::new());
    }

    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_slice(&content).with_context(|| format!("Corrupted usage file {path:?}"))?;

    let mut records = UsageMap::new();
    for (key, value) in raw {
        match serde_json::from_value::<UsageRecord>(value) {
            Ok(record) => {
                records.insert(key, record);
            }
            Err(e) => {
                // Drop the entry instead of refusing to work with the whole file.
                warn!("Skipping illegal record {key} in {path:?}: {e}")
            }
        }
    }
    Ok(records)
}

async fn write_records(path: &Path, records: &UsageMap) -> Result<()> {
    let buffer = serde_json::to_vec(records)?;
    let temporary = path.with_extension("json.tmp");

    let mut file = File::create(&temporary).await?;
    file.write_all(&buffer).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temporary, path)
        .await
        .with_context(|| format!("Can't replace {path:?}"))?;
    debug!("Persisted {} records into {path:?}", records.len());
    Ok(())
}

/// Date a stored entry belongs to. The key is authoritative; the record body is the fallback for
/// keys that don't follow the layout.
fn entry_date(key: &str, record: &UsageRecord) -> NaiveDate {
    match parse_record_key(key) {
        Some((_, date)) => date,
        None => {
            warn!("Record key {key} doesn't follow <domain>_<date>, using its body");
            record.date
        }
    }
}

#[async_trait]
impl UsageStore for FileUsageStore {
    async fn increment(&self, domain: &str, date: NaiveDate, delta_ms: u64) -> Result<UsageRecord> {
        self.modify(|records| {
            let record = records
                .entry(record_key(domain, date))
                .or_insert_with(|| UsageRecord {
                    domain: domain.to_string(),
                    date,
                    time_spent_ms: 0,
                });
            record.time_spent_ms = record.time_spent_ms.saturating_add(delta_ms);
            (record.clone(), true)
        })
        .await
    }

    async fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>> {
        let records = self.read().await?;
        Ok(records
            .into_iter()
            .filter(|(key, record)| entry_date(key, record) == date)
            .map(|(_, record)| record)
            .collect())
    }

    async fn remove_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|key, record| entry_date(key, record) >= cutoff);
            let removed = before - records.len();
            (removed, removed > 0)
        })
        .await
    }

    async fn remove_domain(&self, domain: &str) -> Result<usize> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|_, record| record.domain != domain);
            let removed = before - records.len();
            (removed, removed > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<usize> {
        self.modify(|records| {
            let removed = records.len();
            records.clear();
            (removed, removed > 0)
        })
        .await
    }

    async fn bytes_used(&self) -> Result<u64> {
        match tokio::fs::metadata(self.usage_path()).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::host::storage::entities::UsageRecord;

    use super::{FileUsageStore, UsageStore, USAGE_FILE_NAME};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, d).unwrap()
    }

    #[tokio::test]
    async fn test_increment_is_additive() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;

        storage.increment("github.com", day(4), 1500).await?;
        let record = storage.increment("github.com", day(4), 2500).await?;

        assert_eq!(record.time_spent_ms, 4000);
        assert_eq!(
            storage.records_for(day(4)).await?,
            vec![UsageRecord {
                domain: "github.com".into(),
                date: day(4),
                time_spent_ms: 4000,
            }]
        );
        assert!(storage.records_for(day(5)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_persisted_layout_uses_domain_date_keys() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;
        storage.increment("docs.rs", day(4), 1200).await?;

        let content = std::fs::read_to_string(dir.path().join(USAGE_FILE_NAME))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(
            value["docs.rs_2018-07-04"],
            serde_json::json!({"domain": "docs.rs", "date": "2018-07-04", "timeSpentMs": 1200})
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reopened_store_keeps_records() -> Result<()> {
        let dir = tempdir()?;
        {
            let storage = FileUsageStore::new(dir.path().to_owned())?;
            storage.increment("github.com", day(4), 1000).await?;
        }
        let storage = FileUsageStore::new(dir.path().to_owned())?;
        storage.increment("github.com", day(4), 1000).await?;
        assert_eq!(storage.records_for(day(4)).await?[0].time_spent_ms, 2000);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(FileUsageStore::new(dir.path().to_owned())?);

        let handles = (0..16)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.increment("github.com", day(4), 1000).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await??;
        }

        assert_eq!(storage.records_for(day(4)).await?[0].time_spent_ms, 16_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_older_than_keeps_cutoff_day() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;
        for d in 1..=5 {
            storage.increment("github.com", day(d), 1000).await?;
        }

        assert_eq!(storage.remove_older_than(day(3)).await?, 2);
        assert!(storage.records_for(day(2)).await?.is_empty());
        assert_eq!(storage.records_for(day(3)).await?.len(), 1);
        assert_eq!(storage.remove_older_than(day(3)).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_illegal_entries_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(USAGE_FILE_NAME),
            r#"{"github.com_2018-07-04": {"domain": "github.com", "date": "2018-07-04", "timeSpentMs": 3000},
                "broken_2018-07-04": {"domain": 5}}"#,
        )?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;

        let records = storage.records_for(day(4)).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain, "github.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_domain_and_clear() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;
        storage.increment("github.com", day(4), 1000).await?;
        storage.increment("github.com", day(5), 1000).await?;
        storage.increment("docs.rs", day(5), 1000).await?;

        assert_eq!(storage.remove_domain("github.com").await?, 2);
        assert_eq!(storage.clear().await?, 1);
        assert!(storage.records_for(day(5)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_bytes_used_tracks_file_size() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileUsageStore::new(dir.path().to_owned())?;
        assert_eq!(storage.bytes_used().await?, 0);

        storage.increment("github.com", day(4), 1000).await?;
        let size = std::fs::metadata(dir.path().join(USAGE_FILE_NAME))?.len();
        assert_eq!(storage.bytes_used().await?, size);
        assert!(size > 0);
        Ok(())
    }
}
