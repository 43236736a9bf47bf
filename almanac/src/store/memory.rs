use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::event::{Category, EventRecord};
use crate::store::{EventStore, Predicate, RecordRef};

/// In-process event store.
///
/// Individual records can be made to fail on load or save, which is how the
/// scheduler's partial-failure handling is exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordRef, EventRecord>>,
    categories: RwLock<Vec<Category>>,
    next_id: AtomicU64,
    failing_loads: Mutex<HashSet<RecordRef>>,
    failing_saves: Mutex<HashSet<RecordRef>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_loads(&self, record: RecordRef, failing: bool) {
        toggle(&self.failing_loads, record, failing);
    }

    pub fn fail_saves(&self, record: RecordRef, failing: bool) {
        toggle(&self.failing_saves, record, failing);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check(&self, set: &Mutex<HashSet<RecordRef>>, record: RecordRef) -> Result<(), StoreError> {
        if set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&record)
        {
            return Err(StoreError::Backend(format!("injected failure for {record}")));
        }
        Ok(())
    }
}

fn toggle(set: &Mutex<HashSet<RecordRef>>, record: RecordRef, on: bool) {
    let mut set = set.lock().unwrap_or_else(PoisonError::into_inner);
    if on {
        set.insert(record);
    } else {
        set.remove(&record);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn query(&self, predicate: &Predicate) -> Result<Vec<RecordRef>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|(_, record)| predicate.matches(record))
            .map(|(reference, _)| *reference)
            .collect())
    }

    async fn load(&self, record: RecordRef) -> Result<EventRecord, StoreError> {
        self.check(&self.failing_loads, record)?;
        self.records
            .read()
            .await
            .get(&record)
            .cloned()
            .ok_or(StoreError::NotFound(record))
    }

    async fn save(&self, record: RecordRef, event: &EventRecord) -> Result<(), StoreError> {
        self.check(&self.failing_saves, record)?;
        let mut records = self.records.write().await;
        match records.get_mut(&record) {
            Some(stored) => {
                *stored = event.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record)),
        }
    }

    async fn insert(&self, event: &EventRecord) -> Result<RecordRef, StoreError> {
        let record = RecordRef(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.records.write().await.insert(record, event.clone());
        Ok(record)
    }

    async fn remove(&self, record: RecordRef) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&record)
            .map(|_| ())
            .ok_or(StoreError::NotFound(record))
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.read().await.clone())
    }

    async fn save_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut categories = self.categories.write().await;
        match categories.iter_mut().find(|c| c.name == category.name) {
            Some(existing) => *existing = category.clone(),
            None => categories.push(category.clone()),
        }
        Ok(())
    }
}
