//! The event store contract consumed by the scheduler.

mod memory;

use std::fmt;

use async_trait::async_trait;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::event::{Category, EventRecord};
use crate::time::Timestamp;

pub use memory::MemoryStore;

/// Stable reference to a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct RecordRef(pub u64);

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Record type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Event,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Le,
    Ge,
}

impl Cmp {
    fn holds<T: Ord>(self, left: T, right: T) -> bool {
        match self {
            Cmp::Eq => left == right,
            Cmp::Le => left <= right,
            Cmp::Ge => left >= right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Kind(RecordKind),
    NextOccurrence(Cmp, Timestamp),
    EventFired(bool),
    ReminderOffset(Cmp, u64),
    NextReminder(Cmp, Timestamp),
    ReminderFired(bool),
}

/// A conjunction of comparisons over the scheduling attributes of a record.
/// The empty predicate matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Events whose visible next occurrence has passed and whose activity
    /// has not fired yet.
    pub fn due_events(now: Timestamp) -> Self {
        Self::new()
            .and(Clause::Kind(RecordKind::Event))
            .and(Clause::NextOccurrence(Cmp::Le, now))
            .and(Clause::EventFired(false))
    }

    /// Enabled reminders whose visible time has passed and which have not
    /// fired yet.
    pub fn due_reminders(now: Timestamp) -> Self {
        Self::new()
            .and(Clause::Kind(RecordKind::Event))
            .and(Clause::ReminderOffset(Cmp::Ge, 1))
            .and(Clause::NextReminder(Cmp::Le, now))
            .and(Clause::ReminderFired(false))
    }

    /// Evaluates the predicate against an event record. Records that were
    /// never scheduled match no time comparison.
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.clauses.iter().all(|clause| match *clause {
            Clause::Kind(kind) => kind == RecordKind::Event,
            Clause::NextOccurrence(cmp, at) => record
                .next_occurrence()
                .is_some_and(|next| cmp.holds(next, at)),
            Clause::EventFired(fired) => record.event_activity_fired() == fired,
            Clause::ReminderOffset(cmp, offset) => cmp.holds(record.reminder().offset, offset),
            Clause::NextReminder(cmp, at) => record
                .next_reminder()
                .is_some_and(|next| cmp.holds(next, at)),
            Clause::ReminderFired(fired) => record.reminder_activity_fired() == fired,
        })
    }
}

/// Persisted, attribute-indexed collection of event records.
///
/// Every `save` must be atomic for its record: readers observe either the
/// previous or the new version, never a mix.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query(&self, predicate: &Predicate) -> Result<Vec<RecordRef>, StoreError>;

    async fn load(&self, record: RecordRef) -> Result<EventRecord, StoreError>;

    async fn save(&self, record: RecordRef, event: &EventRecord) -> Result<(), StoreError>;

    async fn insert(&self, event: &EventRecord) -> Result<RecordRef, StoreError>;

    async fn remove(&self, record: RecordRef) -> Result<(), StoreError>;

    async fn categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn save_category(&self, category: &Category) -> Result<(), StoreError>;
}
