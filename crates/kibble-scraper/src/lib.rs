pub mod brand;
pub mod category;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod parse;
pub mod proxy;
pub mod rate_limit;
pub mod retailers;
pub mod urls;
pub mod user_agent;

pub use brand::BrandMatcher;
pub use category::CategoryInferer;
pub use error::{FetchCause, FetchError, ParseError, ScraperError};
pub use extract::{
    Extraction, Extractor, ExtractorKind, ExtractorRegistry, FieldSelectors, ListingExtractor,
    PaginationExtractor, ProductExtractor, RetailerProfile, ReviewExtractor,
};
pub use fetcher::{FetchOptions, FetcherConfig, HttpFetcher, ResponseDiagnostics};
pub use proxy::{NullProxyProvider, ProxyConfig, ProxyManager, ProxyProvider, SessionProxyProvider};
pub use rate_limit::{retry_with_backoff, RetailerThrottle};
pub use user_agent::UserAgentPool;
