//! Storage seams for the event log and the statistics read model.
//!
//! Both traits are synchronous; the in-memory implementations guard their
//! state with a mutex and are what the CLI and tests use.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::events::EventEnvelope;
use crate::projector::RetailerDayStats;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer appended to the stream first.
    #[error("crawl {crawl_id}: expected next sequence {expected}, got {found}")]
    SequenceConflict {
        crawl_id: Uuid,
        expected: u64,
        found: u64,
    },
}

/// Append-only log of lifecycle events.
pub trait EventStore: Send + Sync {
    /// Appends `envelope` as the next event of its crawl.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SequenceConflict`] unless `envelope.sequence` is
    /// exactly one past the stream's last sequence.
    fn append(&self, envelope: EventEnvelope) -> Result<(), StoreError>;

    /// The crawl's events in sequence order; empty for an unknown crawl.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn load(&self, crawl_id: Uuid) -> Result<Vec<EventEnvelope>, StoreError>;

    /// Every stored event in append order.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn all(&self) -> Result<Vec<EventEnvelope>, StoreError>;
}

/// Key of one statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatsKey {
    pub retailer: String,
    pub day: NaiveDate,
}

/// Named read-model rows plus the projector's processed-event checkpoint.
pub trait ReadModelStore: Send + Sync {
    /// # Errors
    ///
    /// Backend failures.
    fn get(&self, key: &StatsKey) -> Result<Option<RetailerDayStats>, StoreError>;

    /// Writes `row` and records `event_id` as processed in one step.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn upsert(
        &self,
        key: StatsKey,
        row: RetailerDayStats,
        event_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Records an event that changed no row.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn mark_processed(&self, event_id: Uuid) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Backend failures.
    fn is_processed(&self, event_id: Uuid) -> Result<bool, StoreError>;

    /// Every row, ordered by retailer then day.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn rows(&self) -> Result<Vec<(StatsKey, RetailerDayStats)>, StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<EventEnvelope>>,
}

impl InMemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, envelope: EventEnvelope) -> Result<(), StoreError> {
        let mut events = lock(&self.events);
        let last = events
            .iter()
            .filter(|e| e.crawl_id == envelope.crawl_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(0);
        if envelope.sequence != last + 1 {
            return Err(StoreError::SequenceConflict {
                crawl_id: envelope.crawl_id,
                expected: last + 1,
                found: envelope.sequence,
            });
        }
        events.push(envelope);
        Ok(())
    }

    fn load(&self, crawl_id: Uuid) -> Result<Vec<EventEnvelope>, StoreError> {
        let mut stream: Vec<EventEnvelope> = lock(&self.events)
            .iter()
            .filter(|e| e.crawl_id == crawl_id)
            .cloned()
            .collect();
        stream.sort_by_key(|e| e.sequence);
        Ok(stream)
    }

    fn all(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        Ok(lock(&self.events).clone())
    }
}

#[derive(Debug, Default)]
struct ReadModels {
    rows: BTreeMap<StatsKey, RetailerDayStats>,
    processed: HashSet<Uuid>,
}

#[derive(Debug, Default)]
pub struct InMemoryReadModelStore {
    inner: Mutex<ReadModels>,
}

impl InMemoryReadModelStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadModelStore for InMemoryReadModelStore {
    fn get(&self, key: &StatsKey) -> Result<Option<RetailerDayStats>, StoreError> {
        Ok(lock(&self.inner).rows.get(key).cloned())
    }

    fn upsert(
        &self,
        key: StatsKey,
        row: RetailerDayStats,
        event_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        inner.rows.insert(key, row);
        inner.processed.insert(event_id);
        Ok(())
    }

    fn mark_processed(&self, event_id: Uuid) -> Result<(), StoreError> {
        lock(&self.inner).processed.insert(event_id);
        Ok(())
    }

    fn is_processed(&self, event_id: Uuid) -> Result<bool, StoreError> {
        Ok(lock(&self.inner).processed.contains(&event_id))
    }

    fn rows(&self) -> Result<Vec<(StatsKey, RetailerDayStats)>, StoreError> {
        Ok(lock(&self.inner)
            .rows
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
