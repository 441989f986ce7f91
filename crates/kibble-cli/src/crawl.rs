//! `crawl` command handler.
//!
//! Events and statistics live in memory for the duration of the command;
//! the statistics table is projected from the event log once every crawl
//! has finished.

use std::sync::Arc;

use kibble_core::AppConfig;
use kibble_crawl::{
    CrawlLifecycle, CrawlRunner, EventStore, InMemoryEventStore, InMemoryReadModelStore,
    Projector, ReadModelStore, RunnerSettings,
};
use kibble_scraper::{Extractor, ExtractorRegistry, HttpFetcher, RetailerThrottle};

/// Crawls every URL in `urls` and prints the outcomes and per-retailer
/// statistics.
///
/// # Errors
///
/// Returns an error if the catalog, registry or fetcher cannot be built, or
/// if every crawl failed. Individual crawl failures are reported and counted.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    urls: Vec<String>,
    max_pages: usize,
    dry_run: bool,
    print_events: bool,
) -> anyhow::Result<()> {
    let catalog = Arc::new(crate::load_catalog(config)?);
    let registry = Arc::new(ExtractorRegistry::with_builtin_profiles(&catalog)?);

    if dry_run {
        for url in &urls {
            match registry.listing_for(url) {
                Some(listing) => println!("dry-run: would crawl {url} ({})", listing.retailer_slug()),
                None => println!("dry-run: skip {url}: no listing extractor accepts it"),
            }
        }
        return Ok(());
    }

    let fetcher = Arc::new(HttpFetcher::from_app_config(config, &catalog)?);
    let throttle = Arc::new(RetailerThrottle::from_catalog(
        &catalog,
        config.default_request_delay_ms,
    ));
    let events = Arc::new(InMemoryEventStore::new());
    let settings = RunnerSettings {
        max_pages: max_pages.max(1),
        ..RunnerSettings::from_app_config(config)
    };
    let runner = CrawlRunner::new(
        registry.clone(),
        fetcher,
        throttle,
        catalog,
        CrawlLifecycle::new(events.clone()),
        settings,
    );

    let outcomes = runner.run(urls).await;
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "ok      {} [{}] {} listings from {} pages ({} page errors)",
                outcome.seed,
                report.retailer,
                report.discovered,
                report.stats.pages_fetched,
                report.stats.fetch_errors
            ),
            Err(err) => {
                failed += 1;
                println!("failed  {}: {err}", outcome.seed);
            }
        }
    }

    if print_events {
        for envelope in events.all()? {
            println!("{}", serde_json::to_string(&envelope)?);
        }
    }

    let read_models = Arc::new(InMemoryReadModelStore::new());
    let projector = Projector::new(events, read_models.clone())
        .with_known_retailers(registry.retailer_slugs());
    projector.catch_up()?;

    println!();
    println!(
        "{:<14} {:<10} {:>7} {:>9} {:>6} {:>8} {:>9}",
        "retailer", "day", "started", "completed", "failed", "listings", "avg ms"
    );
    for (key, row) in read_models.rows()? {
        let avg = row
            .avg_duration_ms
            .map_or_else(|| "-".to_owned(), |ms| format!("{ms:.0}"));
        println!(
            "{:<14} {:<10} {:>7} {:>9} {:>6} {:>8} {:>9}",
            key.retailer,
            key.day,
            row.started,
            row.completed,
            row.failed,
            row.listings_discovered,
            avg
        );
    }

    if !outcomes.is_empty() && failed == outcomes.len() {
        anyhow::bail!("all {failed} crawls failed");
    }
    Ok(())
}
