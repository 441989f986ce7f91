use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kibble_core::{AppConfig, RetailerCatalog};
use tracing_subscriber::EnvFilter;

mod check;
mod crawl;
mod extract;

#[derive(Debug, Parser)]
#[command(name = "kibble")]
#[command(about = "Retailer crawling and extraction")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the extractors for a URL and print the results as JSON lines
    Extract {
        /// Page URL; selects the retailer and extractor
        url: String,
        /// Read HTML from this file instead of fetching the URL
        #[arg(long)]
        file: Option<PathBuf>,
        /// Which extractor to run
        #[arg(long, value_enum, default_value_t = ExtractKind::Auto)]
        kind: ExtractKind,
    },
    /// Fetch a page and report the response diagnostics
    Fetch {
        url: String,
        /// Return the body of non-2xx responses instead of failing
        #[arg(long)]
        lenient: bool,
        /// Write the body to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Crawl listing pages and print per-retailer statistics
    Crawl {
        /// Listing URLs to start from
        #[arg(required = true)]
        urls: Vec<String>,
        /// Listing pages to fetch per crawl, the seed included
        #[arg(long, default_value_t = 10)]
        max_pages: usize,
        /// Print the crawls that would run without fetching anything
        #[arg(long)]
        dry_run: bool,
        /// Print every recorded event as JSON
        #[arg(long)]
        events: bool,
    },
    /// Load and validate the environment and retailer catalog
    CheckConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExtractKind {
    /// Product details and reviews on product pages, links and pages on listings
    Auto,
    Listing,
    Pagination,
    Product,
    Review,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = kibble_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Extract { url, file, kind }) => {
            extract::run_extract(&config, &url, file.as_deref(), kind).await?;
        }
        Some(Commands::Fetch {
            url,
            lenient,
            output,
        }) => extract::run_fetch(&config, &url, lenient, output.as_deref()).await?,
        Some(Commands::Crawl {
            urls,
            max_pages,
            dry_run,
            events,
        }) => crawl::run_crawl(&config, urls, max_pages, dry_run, events).await?,
        Some(Commands::CheckConfig) => check::run_check_config(&config)?,
        None => println!("kibble: use --help for the available commands"),
    }

    Ok(())
}

/// Reads the retailer catalog named by `KIBBLE_CATALOG_PATH`.
pub(crate) fn load_catalog(config: &AppConfig) -> anyhow::Result<RetailerCatalog> {
    kibble_core::load_catalog(&config.catalog_path).with_context(|| {
        format!(
            "failed to load retailer catalog from {}",
            config.catalog_path.display()
        )
    })
}

#[cfg(test)]
mod tests;
