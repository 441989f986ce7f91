pub mod aggregate;
pub mod events;
pub mod projector;
pub mod runner;
pub mod store;

pub use aggregate::{
    decide, fold, CrawlCommand, CrawlLifecycle, CrawlState, CrawlStatus, LifecycleError,
};
pub use events::{CrawlEvent, CrawlStats, EventEnvelope};
pub use projector::{Projected, ProjectionError, ProjectionSummary, Projector, RetailerDayStats};
pub use runner::{CrawlError, CrawlOutcome, CrawlReport, CrawlRunner, RunnerSettings};
pub use store::{
    EventStore, InMemoryEventStore, InMemoryReadModelStore, ReadModelStore, StatsKey, StoreError,
};
