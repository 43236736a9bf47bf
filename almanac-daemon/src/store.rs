use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use almanac::{
    CalendarRegistry, Category, EventRecord, EventStore, Predicate, RecordRef, StoreError,
    Timestamp,
};
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;

const CATEGORIES_FILE: &str = "categories.json";

/// One `<id>.json` file per record plus a `categories.json`, all in one
/// directory. Files are replaced by renaming a freshly written temporary
/// file over them, so readers see either the old or the new record.
///
/// Records written by hand carry no schedule. With a registry attached they
/// are scheduled as they are loaded; without one they can never fire.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    next_id: AtomicU64,
    categories: Mutex<()>,
    registry: Option<Arc<CalendarRegistry>>,
}

impl JsonStore {
    pub async fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let highest = list_records(&dir)
            .await?
            .into_iter()
            .map(|record| record.0)
            .max()
            .unwrap_or(0);

        debug!("Opened event store at {}", dir.display());

        Ok(Self {
            dir,
            next_id: AtomicU64::new(highest),
            categories: Mutex::new(()),
            registry: None,
        })
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<CalendarRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Every record that parses, in reference order.
    pub async fn entries(&self) -> Result<Vec<(RecordRef, EventRecord)>, StoreError> {
        let mut entries = Vec::new();
        for record in list_records(&self.dir).await? {
            match self.load(record).await {
                Ok(event) => entries.push((record, event)),
                Err(err) => warn!("Skipping unreadable record {record}: {err}"),
            }
        }
        Ok(entries)
    }

    fn schedule_unscheduled(&self, record: RecordRef, event: &mut EventRecord) {
        if event.next_occurrence().is_some() {
            return;
        }

        let Some(registry) = &self.registry else {
            warn!("Record {record} (`{}`) was never scheduled and will not fire", event.name);
            return;
        };

        match event.refresh_schedule(registry, Timestamp::now()) {
            Ok(()) => debug!("Scheduled record {record} (`{}`) on load", event.name),
            Err(err) => warn!("Cannot schedule record {record} (`{}`): {err}", event.name),
        }
    }

    fn record_path(&self, record: RecordRef) -> PathBuf {
        self.dir.join(format!("{}.json", record.0))
    }

    async fn read_categories(&self) -> Result<Vec<Category>, StoreError> {
        match fs::read(self.dir.join(CATEGORIES_FILE)).await {
            Ok(bytes) => decode(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

async fn list_records(dir: &Path) -> Result<Vec<RecordRef>, StoreError> {
    let mut records = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|name| name.strip_suffix(".json"))
            .and_then(|stem| stem.parse::<u64>().ok())
        else {
            continue;
        };
        records.push(RecordRef(id));
    }

    records.sort();
    Ok(records)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StoreError::Backend(format!("invalid path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|err| StoreError::Serialization(err.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|err| StoreError::Serialization(err.to_string()))
}

#[async_trait]
impl EventStore for JsonStore {
    async fn query(&self, predicate: &Predicate) -> Result<Vec<RecordRef>, StoreError> {
        let mut matching = Vec::new();
        for record in list_records(&self.dir).await? {
            match self.load(record).await {
                Ok(event) if predicate.matches(&event) => matching.push(record),
                Ok(_) => {}
                Err(err) => warn!("Skipping unreadable record {record}: {err}"),
            }
        }
        Ok(matching)
    }

    async fn load(&self, record: RecordRef) -> Result<EventRecord, StoreError> {
        match fs::read(self.record_path(record)).await {
            Ok(bytes) => {
                let mut event = decode(&bytes)?;
                self.schedule_unscheduled(record, &mut event);
                Ok(event)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(record))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, record: RecordRef, event: &EventRecord) -> Result<(), StoreError> {
        let path = self.record_path(record);
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(record));
        }
        write_atomic(&path, &encode(event)?).await
    }

    async fn insert(&self, event: &EventRecord) -> Result<RecordRef, StoreError> {
        let record = RecordRef(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        write_atomic(&self.record_path(record), &encode(event)?).await?;
        Ok(record)
    }

    async fn remove(&self, record: RecordRef) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(record)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(record))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.read_categories().await
    }

    async fn save_category(&self, category: &Category) -> Result<(), StoreError> {
        // Read-modify-write of the shared file.
        let _guard = self.categories.lock().await;

        let mut categories = self.read_categories().await?;
        match categories.iter_mut().find(|c| c.name == category.name) {
            Some(existing) => *existing = category.clone(),
            None => categories.push(category.clone()),
        }

        write_atomic(&self.dir.join(CATEGORIES_FILE), &encode(&categories)?).await
    }
}
