//! Lifecycle events recorded for every crawl.

use chrono::{DateTime, Utc};
use kibble_core::Metadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Figures reported when a crawl finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Wall-clock time of the crawl. Absent when the caller did not time it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub pages_fetched: u64,
    #[serde(default)]
    pub fetch_errors: u64,
}

/// One fact about a crawl. Events are never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlEvent {
    CrawlStarted {
        crawl_id: Uuid,
        url: String,
        retailer: String,
        #[serde(default)]
        metadata: Metadata,
    },
    ListingDiscovered {
        crawl_id: Uuid,
        url: String,
        retailer: String,
        category: Option<String>,
        #[serde(default)]
        metadata: Metadata,
    },
    CrawlCompleted {
        crawl_id: Uuid,
        discovered_count: u64,
        #[serde(default)]
        stats: CrawlStats,
    },
    CrawlFailed {
        crawl_id: Uuid,
        reason: String,
        #[serde(default)]
        context: Metadata,
    },
}

impl CrawlEvent {
    #[must_use]
    pub fn crawl_id(&self) -> Uuid {
        match self {
            Self::CrawlStarted { crawl_id, .. }
            | Self::ListingDiscovered { crawl_id, .. }
            | Self::CrawlCompleted { crawl_id, .. }
            | Self::CrawlFailed { crawl_id, .. } => *crawl_id,
        }
    }

    /// Stable event-type name, as used in the serialized `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CrawlStarted { .. } => "crawl_started",
            Self::ListingDiscovered { .. } => "listing_discovered",
            Self::CrawlCompleted { .. } => "crawl_completed",
            Self::CrawlFailed { .. } => "crawl_failed",
        }
    }
}

/// A stored event with its position in the crawl's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub crawl_id: Uuid,
    /// 1-based position within the crawl's stream.
    pub sequence: u64,
    pub occurred_at: DateTime<Utc>,
    pub event: CrawlEvent,
}

impl EventEnvelope {
    /// Wraps `event` with a fresh event id, stamped now.
    #[must_use]
    pub fn new(sequence: u64, event: CrawlEvent) -> Self {
        Self::at(sequence, event, Utc::now())
    }

    #[must_use]
    pub fn at(sequence: u64, event: CrawlEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            crawl_id: event.crawl_id(),
            sequence,
            occurred_at,
            event,
        }
    }
}
