//! The crawl lifecycle as an event-sourced aggregate.
//!
//! A crawl's state is never stored; it is [`fold`]ed from the crawl's own
//! events every time a command runs. [`decide`] checks a command against that
//! state and returns the event to append, if any.

use std::fmt;
use std::sync::Arc;

use kibble_core::{ListingUrl, Metadata};
use thiserror::Error;
use uuid::Uuid;

use crate::events::{CrawlEvent, CrawlStats, EventEnvelope};
use crate::store::{EventStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlStatus {
    /// No events recorded.
    #[default]
    New,
    Started,
    Discovering,
    Completed,
    Failed,
}

impl CrawlStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Started => "started",
            Self::Discovering => "discovering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("crawl {crawl_id} is {status}; cannot {command}")]
    InvalidState {
        crawl_id: Uuid,
        status: CrawlStatus,
        command: &'static str,
    },

    #[error("crawl {0} has no recorded events")]
    UnknownCrawl(Uuid),

    #[error("crawl {crawl_id} belongs to {expected}; listing names {found}")]
    RetailerMismatch {
        crawl_id: Uuid,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything known about one crawl, derived from its events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlState {
    pub crawl_id: Option<Uuid>,
    pub status: CrawlStatus,
    pub url: Option<String>,
    pub retailer: Option<String>,
    pub listings_discovered: u64,
    /// Sequence of the last applied event; 0 for a new crawl.
    pub version: u64,
    /// Payload of the terminal event, kept as first recorded.
    pub outcome: Option<CrawlEvent>,
}

impl CrawlState {
    /// Applies one event. Terminal states absorb anything that follows.
    #[must_use]
    pub fn apply(mut self, event: &CrawlEvent) -> Self {
        self.version += 1;
        if self.status.is_terminal() {
            return self;
        }
        match event {
            CrawlEvent::CrawlStarted {
                crawl_id,
                url,
                retailer,
                ..
            } => {
                self.crawl_id = Some(*crawl_id);
                self.url = Some(url.clone());
                self.retailer = Some(retailer.clone());
                self.status = CrawlStatus::Started;
            }
            CrawlEvent::ListingDiscovered { .. } => {
                self.listings_discovered += 1;
                self.status = CrawlStatus::Discovering;
            }
            CrawlEvent::CrawlCompleted { .. } => {
                self.status = CrawlStatus::Completed;
                self.outcome = Some(event.clone());
            }
            CrawlEvent::CrawlFailed { .. } => {
                self.status = CrawlStatus::Failed;
                self.outcome = Some(event.clone());
            }
        }
        self
    }
}

/// Replays events in order into a [`CrawlState`].
pub fn fold<'a>(events: impl IntoIterator<Item = &'a CrawlEvent>) -> CrawlState {
    events
        .into_iter()
        .fold(CrawlState::default(), CrawlState::apply)
}

/// A request to change a crawl.
#[derive(Debug, Clone)]
pub enum CrawlCommand {
    Start {
        crawl_id: Uuid,
        url: String,
        retailer: String,
        metadata: Metadata,
    },
    RecordListing(ListingUrl),
    Complete {
        discovered_count: u64,
        stats: CrawlStats,
    },
    MarkFailed {
        reason: String,
        context: Metadata,
    },
}

impl CrawlCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::RecordListing(_) => "record a listing",
            Self::Complete { .. } => "complete",
            Self::MarkFailed { .. } => "mark failed",
        }
    }
}

/// Validates `command` against `state`.
///
/// Returns the event to append, or `None` when the command is a repeat that
/// changes nothing (`Complete` on a completed crawl, `MarkFailed` on any
/// terminal crawl).
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidState`] for an illegal transition,
/// [`LifecycleError::UnknownCrawl`] for a command on a crawl never started, and
/// [`LifecycleError::RetailerMismatch`] for a listing from another retailer.
pub fn decide(
    state: &CrawlState,
    crawl_id: Uuid,
    command: CrawlCommand,
) -> Result<Option<CrawlEvent>, LifecycleError> {
    let invalid = |command: &CrawlCommand| LifecycleError::InvalidState {
        crawl_id,
        status: state.status,
        command: command.name(),
    };

    match (state.status, command) {
        (
            CrawlStatus::New,
            CrawlCommand::Start {
                crawl_id,
                url,
                retailer,
                metadata,
            },
        ) => Ok(Some(CrawlEvent::CrawlStarted {
            crawl_id,
            url,
            retailer,
            metadata,
        })),
        (_, command @ CrawlCommand::Start { .. }) => Err(invalid(&command)),
        (CrawlStatus::New, _) => Err(LifecycleError::UnknownCrawl(crawl_id)),

        (CrawlStatus::Started | CrawlStatus::Discovering, CrawlCommand::RecordListing(listing)) => {
            let retailer = state.retailer.clone().unwrap_or_default();
            if listing.retailer_slug != retailer {
                return Err(LifecycleError::RetailerMismatch {
                    crawl_id,
                    expected: retailer,
                    found: listing.retailer_slug,
                });
            }
            Ok(Some(CrawlEvent::ListingDiscovered {
                crawl_id,
                url: listing.url,
                retailer,
                category: listing.category,
                metadata: listing.metadata,
            }))
        }
        (_, command @ CrawlCommand::RecordListing(_)) => Err(invalid(&command)),

        (
            CrawlStatus::Started | CrawlStatus::Discovering,
            CrawlCommand::Complete {
                discovered_count,
                stats,
            },
        ) => Ok(Some(CrawlEvent::CrawlCompleted {
            crawl_id,
            discovered_count,
            stats,
        })),
        (CrawlStatus::Completed, CrawlCommand::Complete { .. }) => Ok(None),
        (_, command @ CrawlCommand::Complete { .. }) => Err(invalid(&command)),

        (
            CrawlStatus::Started | CrawlStatus::Discovering,
            CrawlCommand::MarkFailed { reason, context },
        ) => Ok(Some(CrawlEvent::CrawlFailed {
            crawl_id,
            reason,
            context,
        })),
        (_, CrawlCommand::MarkFailed { .. }) => Ok(None),
    }
}

/// Runs lifecycle commands against an [`EventStore`].
///
/// Every command loads the crawl's stream, folds it, decides, and appends at
/// the next sequence. A concurrent writer that got there first surfaces as
/// [`StoreError::SequenceConflict`].
#[derive(Clone)]
pub struct CrawlLifecycle {
    store: Arc<dyn EventStore>,
}

impl fmt::Debug for CrawlLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlLifecycle").finish_non_exhaustive()
    }
}

impl CrawlLifecycle {
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Current state of `crawl_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if the stream cannot be loaded.
    pub fn state(&self, crawl_id: Uuid) -> Result<CrawlState, LifecycleError> {
        let stream = self.store.load(crawl_id)?;
        Ok(fold(stream.iter().map(|e| &e.event)))
    }

    /// Mints a crawl id and records `CrawlStarted`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if the append fails.
    pub fn start(
        &self,
        url: &str,
        retailer: &str,
        metadata: Metadata,
    ) -> Result<Uuid, LifecycleError> {
        let crawl_id = Uuid::new_v4();
        self.execute(
            crawl_id,
            CrawlCommand::Start {
                crawl_id,
                url: url.to_owned(),
                retailer: retailer.to_owned(),
                metadata,
            },
        )?;
        tracing::info!(%crawl_id, url, retailer, "crawl started");
        Ok(crawl_id)
    }

    /// Records one discovered listing.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] once the crawl has completed
    /// or failed.
    pub fn record_listing(
        &self,
        crawl_id: Uuid,
        listing: ListingUrl,
    ) -> Result<EventEnvelope, LifecycleError> {
        self.execute(crawl_id, CrawlCommand::RecordListing(listing))?
            .ok_or(LifecycleError::UnknownCrawl(crawl_id))
    }

    /// Records completion. Returns `None` when the crawl was already
    /// completed; the first completion's payload is kept.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] if the crawl failed.
    pub fn complete(
        &self,
        crawl_id: Uuid,
        discovered_count: u64,
        stats: CrawlStats,
    ) -> Result<Option<EventEnvelope>, LifecycleError> {
        let appended = self.execute(
            crawl_id,
            CrawlCommand::Complete {
                discovered_count,
                stats,
            },
        )?;
        if appended.is_some() {
            tracing::info!(%crawl_id, discovered_count, "crawl completed");
        }
        Ok(appended)
    }

    /// Records failure. Returns `None` when the crawl had already reached a
    /// terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownCrawl`] for a crawl never started.
    pub fn mark_failed(
        &self,
        crawl_id: Uuid,
        reason: &str,
        context: Metadata,
    ) -> Result<Option<EventEnvelope>, LifecycleError> {
        let appended = self.execute(
            crawl_id,
            CrawlCommand::MarkFailed {
                reason: reason.to_owned(),
                context,
            },
        )?;
        if appended.is_some() {
            tracing::warn!(%crawl_id, reason, "crawl failed");
        } else {
            tracing::debug!(%crawl_id, "crawl already terminal; failure not recorded");
        }
        Ok(appended)
    }

    fn execute(
        &self,
        crawl_id: Uuid,
        command: CrawlCommand,
    ) -> Result<Option<EventEnvelope>, LifecycleError> {
        let state = self.state(crawl_id)?;
        let Some(event) = decide(&state, crawl_id, command)? else {
            return Ok(None);
        };
        let envelope = EventEnvelope::new(state.version + 1, event);
        self.store.append(envelope.clone())?;
        Ok(Some(envelope))
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
