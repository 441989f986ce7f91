//! Reference crawl orchestration.
//!
//! Each seed URL becomes one crawl: its listing pages are fetched (following
//! pagination up to a page cap), every product link is recorded as a
//! `ListingDiscovered` event, and the crawl ends `Completed` or `Failed`.
//! Seeds run concurrently as a bounded pool of independent futures.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use kibble_core::{AppConfig, ListingUrl, Metadata, PaginatedListingUrl, RetailerCatalog};
use kibble_scraper::{
    retry_with_backoff, Extractor, ExtractorRegistry, FetchError, FetchOptions, HttpFetcher,
    RetailerThrottle,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::{CrawlLifecycle, LifecycleError};
use crate::events::CrawlStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub max_concurrent: usize,
    /// Listing pages fetched per crawl, the seed included.
    pub max_pages: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_pages: 10,
            max_retries: 2,
            retry_backoff_base_ms: 1000,
        }
    }
}

impl RunnerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_crawls.max(1),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("no retailer profile owns {url}")]
    UnsupportedUrl { url: String },

    #[error("{url} is not a listing page for {retailer}")]
    NotAListing { url: String, retailer: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Result of one seed.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub seed: String,
    /// Absent when the seed was rejected before a crawl was started.
    pub crawl_id: Option<Uuid>,
    pub result: Result<CrawlReport, CrawlError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub retailer: String,
    pub discovered: u64,
    pub stats: CrawlStats,
}

pub struct CrawlRunner {
    registry: Arc<ExtractorRegistry>,
    fetcher: Arc<HttpFetcher>,
    throttle: Arc<RetailerThrottle>,
    catalog: Arc<RetailerCatalog>,
    lifecycle: CrawlLifecycle,
    settings: RunnerSettings,
}

impl std::fmt::Debug for CrawlRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlRunner")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CrawlRunner {
    #[must_use]
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        fetcher: Arc<HttpFetcher>,
        throttle: Arc<RetailerThrottle>,
        catalog: Arc<RetailerCatalog>,
        lifecycle: CrawlLifecycle,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            throttle,
            catalog,
            lifecycle,
            settings,
        }
    }

    /// Crawls every seed, at most `max_concurrent` at a time. Outcomes arrive
    /// in completion order.
    pub async fn run(&self, seeds: Vec<String>) -> Vec<CrawlOutcome> {
        let max_concurrent = self.settings.max_concurrent.max(1);
        tracing::info!(seeds = seeds.len(), max_concurrent, "crawl run starting");

        let outcomes: Vec<CrawlOutcome> = stream::iter(seeds)
            .map(|seed| self.crawl(seed))
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(crawls = outcomes.len(), failed, "crawl run finished");
        outcomes
    }

    /// Runs one crawl from `seed` to a terminal event.
    pub async fn crawl(&self, seed: String) -> CrawlOutcome {
        let Some(retailer) = self.registry.retailer_for(&seed).map(str::to_owned) else {
            tracing::warn!(url = %seed, "no retailer profile for seed");
            return CrawlOutcome {
                result: Err(CrawlError::UnsupportedUrl { url: seed.clone() }),
                seed,
                crawl_id: None,
            };
        };

        let mut metadata = Metadata::new();
        metadata.insert("trigger".to_owned(), Value::from("runner"));
        let crawl_id = match self.lifecycle.start(&seed, &retailer, metadata) {
            Ok(id) => id,
            Err(err) => {
                return CrawlOutcome {
                    seed,
                    crawl_id: None,
                    result: Err(err.into()),
                }
            }
        };

        let result = match self.discover(crawl_id, &seed, &retailer).await {
            Ok(report) => self
                .lifecycle
                .complete(crawl_id, report.discovered, report.stats.clone())
                .map(|_| report)
                .map_err(CrawlError::from),
            Err(err) => {
                self.fail_best_effort(crawl_id, &seed, &err);
                Err(err)
            }
        };

        CrawlOutcome {
            seed,
            crawl_id: Some(crawl_id),
            result,
        }
    }

    async fn discover(
        &self,
        crawl_id: Uuid,
        seed: &str,
        retailer: &str,
    ) -> Result<CrawlReport, CrawlError> {
        let started = Instant::now();
        let Some(listing) = self.registry.listing_for(seed) else {
            return Err(CrawlError::NotAListing {
                url: seed.to_owned(),
                retailer: retailer.to_owned(),
            });
        };
        let options = FetchOptions::for_retailer(&self.catalog, retailer);

        let mut queue = VecDeque::from([seed.to_owned()]);
        let mut queued: HashSet<String> = HashSet::from([seed.to_owned()]);
        let mut seen_products: HashSet<String> = HashSet::new();
        let mut stats = CrawlStats::default();
        let mut discovered = 0u64;

        while let Some(page) = queue.pop_front() {
            let html = match self.fetch_page(&page, retailer, &options).await {
                Ok(html) => html,
                // Only a failure on the seed page fails the crawl.
                Err(err) if page == seed => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(%crawl_id, url = %page, error = %err, "listing page skipped");
                    stats.fetch_errors += 1;
                    continue;
                }
            };
            stats.pages_fetched += 1;

            let listings: Vec<ListingUrl> = listing
                .extract(&html, &page)
                .filter(|l| seen_products.insert(l.url.clone()))
                .collect();
            tracing::debug!(%crawl_id, url = %page, found = listings.len(), "listing page parsed");
            for found in listings {
                self.lifecycle.record_listing(crawl_id, found)?;
                discovered += 1;
            }

            if let Some(pagination) = self.registry.pagination_for(&page) {
                let next: Vec<PaginatedListingUrl> = pagination.extract(&html, &page).collect();
                for p in next {
                    if queued.len() >= self.settings.max_pages {
                        break;
                    }
                    if queued.insert(p.url.clone()) {
                        queue.push_back(p.url);
                    }
                }
            }
        }

        stats.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        Ok(CrawlReport {
            retailer: retailer.to_owned(),
            discovered,
            stats,
        })
    }

    async fn fetch_page(
        &self,
        url: &str,
        retailer: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_ms,
            move || async move {
                self.throttle.wait_turn(retailer).await;
                self.fetcher.fetch(url, options).await
            },
        )
        .await
    }

    /// Records `CrawlFailed`; a storage error here is only logged so the
    /// original error reaches the caller.
    fn fail_best_effort(&self, crawl_id: Uuid, seed: &str, err: &CrawlError) {
        let mut context = Metadata::new();
        context.insert("url".to_owned(), Value::from(seed));
        if let CrawlError::Fetch(fetch) = err {
            context.insert("failed_url".to_owned(), Value::from(fetch.url.as_str()));
            context.insert("transient".to_owned(), Value::from(fetch.is_transient()));
            if let Some(status) = fetch.status() {
                context.insert("status".to_owned(), Value::from(status));
            }
            if let Some(agent) = &fetch.user_agent {
                context.insert("user_agent".to_owned(), Value::from(agent.as_str()));
            }
            if let Some(proxy) = &fetch.proxy {
                context.insert("proxy".to_owned(), Value::from(proxy.as_str()));
            }
        }
        if let Err(record_err) = self.lifecycle.mark_failed(crawl_id, &err.to_string(), context) {
            tracing::error!(%crawl_id, error = %record_err, "failed to record crawl failure");
        }
    }
}
