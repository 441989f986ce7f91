//! `extract` and `fetch` command handlers.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use kibble_core::AppConfig;
use kibble_scraper::{Extractor, ExtractorKind, ExtractorRegistry, FetchOptions, HttpFetcher};
use serde::Serialize;

use crate::ExtractKind;

/// One JSON line of `extract` output.
#[derive(Debug, Serialize)]
struct Line<T> {
    kind: &'static str,
    data: T,
}

fn emit<T: Serialize>(
    out: &mut impl Write,
    kind: ExtractorKind,
    items: impl Iterator<Item = T>,
) -> anyhow::Result<usize> {
    let mut count = 0;
    for data in items {
        serde_json::to_writer(
            &mut *out,
            &Line {
                kind: kind.as_str(),
                data,
            },
        )?;
        writeln!(out)?;
        count += 1;
    }
    Ok(count)
}

fn require<E>(found: Option<E>, kind: ExtractorKind, url: &str) -> anyhow::Result<E> {
    found.ok_or_else(|| anyhow!("no {kind} extractor accepts {url}"))
}

/// Runs the built-in extractors over `url`, reading HTML from `file` when
/// given and fetching it otherwise.
///
/// # Errors
///
/// Returns an error if the catalog or registry cannot be built, no extractor
/// of the requested kind accepts the URL, or the page cannot be read.
pub(crate) async fn run_extract(
    config: &AppConfig,
    url: &str,
    file: Option<&Path>,
    kind: ExtractKind,
) -> anyhow::Result<()> {
    let catalog = crate::load_catalog(config)?;
    let registry = ExtractorRegistry::with_builtin_profiles(&catalog)?;

    let html = if let Some(path) = file {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else {
        let retailer = registry
            .retailer_for(url)
            .ok_or_else(|| anyhow!("no retailer profile owns {url}"))?;
        let fetcher = HttpFetcher::from_app_config(config, &catalog)?;
        fetcher
            .fetch(url, &FetchOptions::for_retailer(&catalog, retailer))
            .await?
    };

    let mut out = std::io::stdout().lock();
    let extracted = match kind {
        ExtractKind::Listing => {
            let listing = require(registry.listing_for(url), ExtractorKind::Listing, url)?;
            emit(&mut out, ExtractorKind::Listing, listing.extract(&html, url))?
        }
        ExtractKind::Pagination => {
            let pages = require(registry.pagination_for(url), ExtractorKind::Pagination, url)?;
            emit(&mut out, ExtractorKind::Pagination, pages.extract(&html, url))?
        }
        ExtractKind::Product => {
            let product = require(registry.product_for(url), ExtractorKind::Product, url)?;
            emit(&mut out, ExtractorKind::Product, product.extract(&html, url))?
        }
        ExtractKind::Review => {
            let reviews = require(registry.review_for(url), ExtractorKind::Review, url)?;
            emit(&mut out, ExtractorKind::Review, reviews.extract(&html, url))?
        }
        ExtractKind::Auto => {
            if let Some(product) = registry.product_for(url) {
                let mut n = emit(&mut out, ExtractorKind::Product, product.extract(&html, url))?;
                if let Some(reviews) = registry.review_for(url) {
                    n += emit(&mut out, ExtractorKind::Review, reviews.extract(&html, url))?;
                }
                n
            } else if let Some(listing) = registry.listing_for(url) {
                let mut n = emit(&mut out, ExtractorKind::Listing, listing.extract(&html, url))?;
                if let Some(pages) = registry.pagination_for(url) {
                    n += emit(&mut out, ExtractorKind::Pagination, pages.extract(&html, url))?;
                }
                n
            } else {
                bail!("no extractor accepts {url}");
            }
        }
    };

    tracing::info!(url, items = extracted, "extraction finished");
    if extracted == 0 {
        eprintln!("no items extracted from {url}");
    }
    Ok(())
}

/// Fetches `url` once and prints what the response looked like.
///
/// # Errors
///
/// Returns an error if the fetch fails (after the diagnostics are printed)
/// or the body cannot be written.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    url: &str,
    lenient: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let catalog = crate::load_catalog(config)?;
    let registry = ExtractorRegistry::with_builtin_profiles(&catalog)?;
    let fetcher = HttpFetcher::from_app_config(config, &catalog)?;

    let mut options = registry
        .retailer_for(url)
        .map(|slug| FetchOptions::for_retailer(&catalog, slug))
        .unwrap_or_default();
    if lenient {
        options = options.lenient();
    }

    let result = fetcher.fetch(url, &options).await;
    if let Some(last) = fetcher.last_response() {
        eprintln!("status:     {}", last.status);
        eprintln!("final url:  {}", last.url);
        eprintln!("elapsed:    {} ms", last.elapsed.as_millis());
        eprintln!("user agent: {}", last.user_agent);
        eprintln!("proxy:      {}", last.proxy.as_deref().unwrap_or("none"));
        for (name, value) in &last.headers {
            eprintln!("  {name}: {value}");
        }
    }
    let body = result?;

    match output {
        Some(path) => {
            std::fs::write(path, &body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {} bytes to {}", body.len(), path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}
