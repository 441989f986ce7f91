//! Page extractors.
//!
//! Every retailer is described by a declarative [`RetailerProfile`]; one
//! shared cascade engine turns a compiled profile into the four extractor
//! kinds. The orchestrator picks exactly one extractor per URL through the
//! [`ExtractorRegistry`].

pub mod dom;
pub mod listing;
pub mod pagination;
pub mod product;
pub mod profile;
pub mod registry;
pub mod review;
pub mod structured;

use std::fmt;

pub use listing::ListingExtractor;
pub use pagination::PaginationExtractor;
pub use product::ProductExtractor;
pub use profile::{CompiledProfile, FieldSelectors, RetailerProfile};
pub use registry::ExtractorRegistry;
pub use review::ReviewExtractor;

/// Lazily produced extraction results. Finite and consumed once.
pub type Extraction<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// Turns one kind of retailer page into normalized records.
pub trait Extractor<T> {
    fn retailer_slug(&self) -> &str;

    /// Pure URL predicate. At most one registered extractor of a kind
    /// accepts any given URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Records found in `html`, fetched from `url`. Fields that cannot be
    /// located are absent; a page without the required fields yields nothing.
    fn extract<'a>(&'a self, html: &'a str, url: &'a str) -> Extraction<'a, T>;
}

/// The four page kinds an extractor can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Listing,
    Pagination,
    Product,
    Review,
}

impl ExtractorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Pagination => "pagination",
            Self::Product => "product",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
