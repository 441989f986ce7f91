//! Per-retailer, per-day crawl statistics folded from lifecycle events.
//!
//! Delivery is at-least-once: an event already recorded in the read model's
//! checkpoint is skipped, so replaying the whole log is always safe.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::events::{CrawlEvent, EventEnvelope};
use crate::store::{EventStore, ReadModelStore, StatsKey, StoreError};

/// One read-model row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetailerDayStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub listings_discovered: u64,
    /// Mean duration over the completions that reported one.
    pub avg_duration_ms: Option<f64>,
    pub durations_counted: u64,
}

impl RetailerDayStats {
    #[allow(clippy::cast_precision_loss)]
    fn record_duration(&mut self, duration_ms: u64) {
        let n = self.durations_counted as f64;
        let avg = self.avg_duration_ms.unwrap_or(0.0);
        self.avg_duration_ms = Some((avg * n + duration_ms as f64) / (n + 1.0));
        self.durations_counted += 1;
    }
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("event {event_id} of crawl {crawl_id}: retailer could not be resolved")]
    UnrecognizedRetailer { crawl_id: Uuid, event_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to one delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projected {
    Applied,
    /// Already in the checkpoint.
    Duplicate,
    /// Not a statistics event.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionSummary {
    pub applied: usize,
    pub duplicates: usize,
    pub ignored: usize,
    pub skipped: usize,
}

pub struct Projector {
    events: Arc<dyn EventStore>,
    read_models: Arc<dyn ReadModelStore>,
    known_retailers: Option<HashSet<String>>,
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projector")
            .field("known_retailers", &self.known_retailers)
            .finish_non_exhaustive()
    }
}

impl Projector {
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, read_models: Arc<dyn ReadModelStore>) -> Self {
        Self {
            events,
            read_models,
            known_retailers: None,
        }
    }

    /// Restricts projection to these retailer slugs; events for any other
    /// retailer are unrecognized.
    #[must_use]
    pub fn with_known_retailers<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_retailers = Some(slugs.into_iter().map(Into::into).collect());
        self
    }

    /// Projects one delivered event.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnrecognizedRetailer`] when the event's
    /// retailer cannot be resolved or is not known, and
    /// [`ProjectionError::Store`] on storage failure.
    pub fn project(&self, envelope: &EventEnvelope) -> Result<Projected, ProjectionError> {
        if self.read_models.is_processed(envelope.event_id)? {
            tracing::debug!(event_id = %envelope.event_id, "duplicate delivery skipped");
            return Ok(Projected::Duplicate);
        }

        let retailer = match &envelope.event {
            CrawlEvent::ListingDiscovered { .. } => {
                self.read_models.mark_processed(envelope.event_id)?;
                return Ok(Projected::Ignored);
            }
            CrawlEvent::CrawlStarted { retailer, .. } => Some(retailer.clone()),
            CrawlEvent::CrawlCompleted { .. } | CrawlEvent::CrawlFailed { .. } => {
                self.started_retailer(envelope.crawl_id)?
            }
        };
        let Some(retailer) = retailer.filter(|r| self.is_known(r)) else {
            return Err(ProjectionError::UnrecognizedRetailer {
                crawl_id: envelope.crawl_id,
                event_id: envelope.event_id,
            });
        };

        let key = StatsKey {
            retailer,
            day: envelope.occurred_at.date_naive(),
        };
        let mut row = self.read_models.get(&key)?.unwrap_or_default();
        match &envelope.event {
            CrawlEvent::CrawlStarted { .. } => row.started += 1,
            CrawlEvent::CrawlCompleted {
                discovered_count,
                stats,
                ..
            } => {
                row.completed += 1;
                row.listings_discovered += discovered_count;
                if let Some(duration_ms) = stats.duration_ms {
                    row.record_duration(duration_ms);
                }
            }
            CrawlEvent::CrawlFailed { .. } => row.failed += 1,
            CrawlEvent::ListingDiscovered { .. } => {}
        }
        self.read_models.upsert(key, row, envelope.event_id)?;
        Ok(Projected::Applied)
    }

    /// Projects a batch, logging and skipping events whose retailer is
    /// unrecognized.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`].
    pub fn project_all<'a>(
        &self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope>,
    ) -> Result<ProjectionSummary, StoreError> {
        let mut summary = ProjectionSummary::default();
        for envelope in envelopes {
            match self.project(envelope) {
                Ok(Projected::Applied) => summary.applied += 1,
                Ok(Projected::Duplicate) => summary.duplicates += 1,
                Ok(Projected::Ignored) => summary.ignored += 1,
                Err(ProjectionError::UnrecognizedRetailer { crawl_id, event_id }) => {
                    tracing::warn!(
                        %crawl_id,
                        %event_id,
                        kind = envelope.event.kind(),
                        "unrecognized retailer; event skipped"
                    );
                    self.read_models.mark_processed(event_id)?;
                    summary.skipped += 1;
                }
                Err(ProjectionError::Store(err)) => return Err(err),
            }
        }
        Ok(summary)
    }

    /// Replays the whole event log.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`].
    pub fn catch_up(&self) -> Result<ProjectionSummary, StoreError> {
        let events = self.events.all()?;
        let summary = self.project_all(&events)?;
        tracing::info!(
            applied = summary.applied,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            "projection caught up"
        );
        Ok(summary)
    }

    fn started_retailer(&self, crawl_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self
            .events
            .load(crawl_id)?
            .into_iter()
            .find_map(|e| match e.event {
                CrawlEvent::CrawlStarted { retailer, .. } => Some(retailer),
                _ => None,
            }))
    }

    fn is_known(&self, retailer: &str) -> bool {
        self.known_retailers
            .as_ref()
            .map_or(true, |known| known.contains(retailer))
    }
}

#[cfg(test)]
#[path = "projector_test.rs"]
mod tests;
