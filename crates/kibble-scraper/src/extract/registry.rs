use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kibble_core::{ListingUrl, PaginatedListingUrl, ProductDetail, ProductReview, RetailerCatalog};

use super::profile::{CompiledProfile, RetailerProfile};
use super::{
    Extractor, ExtractorKind, ListingExtractor, PaginationExtractor, ProductExtractor,
    ReviewExtractor,
};
use crate::error::ScraperError;
use crate::retailers;

/// Every extractor built from a set of retailer profiles.
///
/// Lookups return the single extractor of a kind that accepts a URL. There is
/// no fallback from one extractor to another.
pub struct ExtractorRegistry {
    profiles: Vec<Arc<CompiledProfile>>,
    listing: Vec<ListingExtractor>,
    pagination: Vec<PaginationExtractor>,
    product: Vec<ProductExtractor>,
    review: Vec<ReviewExtractor>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("retailers", &self.retailer_slugs())
            .finish_non_exhaustive()
    }
}

impl ExtractorRegistry {
    /// Compiles `profiles` against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::DuplicateProfile`] or
    /// [`ScraperError::SharedHost`] when two profiles could claim the same
    /// URL, or the compile error of the first invalid profile.
    pub fn new(
        profiles: Vec<RetailerProfile>,
        catalog: &RetailerCatalog,
    ) -> Result<Self, ScraperError> {
        let mut slugs = HashSet::new();
        let mut host_owner: HashMap<String, String> = HashMap::new();
        let mut compiled = Vec::with_capacity(profiles.len());

        for profile in &profiles {
            if !slugs.insert(profile.slug.clone()) {
                return Err(ScraperError::DuplicateProfile {
                    slug: profile.slug.clone(),
                });
            }
            for host in &profile.hosts {
                if let Some(first) = host_owner.insert(host.clone(), profile.slug.clone()) {
                    return Err(ScraperError::SharedHost {
                        host: host.clone(),
                        first,
                        second: profile.slug.clone(),
                    });
                }
            }
            if !catalog.is_known_retailer(&profile.slug) {
                tracing::warn!(retailer = %profile.slug, "profile has no catalog entry; using defaults");
            }
            compiled.push(Arc::new(profile.compile(catalog)?));
        }

        tracing::debug!(count = compiled.len(), "extractor registry built");
        Ok(Self {
            listing: compiled.iter().cloned().map(ListingExtractor::new).collect(),
            pagination: compiled.iter().cloned().map(PaginationExtractor::new).collect(),
            product: compiled.iter().cloned().map(ProductExtractor::new).collect(),
            review: compiled.iter().cloned().map(ReviewExtractor::new).collect(),
            profiles: compiled,
        })
    }

    /// Registry over the built-in retailer profiles, checked against their
    /// sample URLs.
    ///
    /// # Errors
    ///
    /// Propagates [`ExtractorRegistry::new`] and [`ExtractorRegistry::validate`]
    /// failures.
    pub fn with_builtin_profiles(catalog: &RetailerCatalog) -> Result<Self, ScraperError> {
        let registry = Self::new(retailers::builtin_profiles(), catalog)?;
        registry.validate(retailers::SAMPLE_URLS)?;
        Ok(registry)
    }

    #[must_use]
    pub fn retailer_slugs(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.slug.as_str()).collect()
    }

    /// Retailer owning the URL's host.
    #[must_use]
    pub fn retailer_for(&self, url: &str) -> Option<&str> {
        self.profiles
            .iter()
            .find(|p| p.owns_host(url))
            .map(|p| p.slug.as_str())
    }

    #[must_use]
    pub fn listing_for(&self, url: &str) -> Option<&ListingExtractor> {
        single::<ListingUrl, _>(&self.listing, url, ExtractorKind::Listing)
    }

    #[must_use]
    pub fn pagination_for(&self, url: &str) -> Option<&PaginationExtractor> {
        single::<PaginatedListingUrl, _>(&self.pagination, url, ExtractorKind::Pagination)
    }

    #[must_use]
    pub fn product_for(&self, url: &str) -> Option<&ProductExtractor> {
        single::<ProductDetail, _>(&self.product, url, ExtractorKind::Product)
    }

    #[must_use]
    pub fn review_for(&self, url: &str) -> Option<&ReviewExtractor> {
        single::<ProductReview, _>(&self.review, url, ExtractorKind::Review)
    }

    /// Checks that no URL in `corpus` is accepted by two extractors of one
    /// kind, or by both a listing and a product extractor.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::OverlappingExtractors`] for the first conflict.
    pub fn validate(&self, corpus: &[&str]) -> Result<(), ScraperError> {
        for url in corpus {
            overlap::<ListingUrl, _>(&self.listing, url, ExtractorKind::Listing)?;
            overlap::<PaginatedListingUrl, _>(&self.pagination, url, ExtractorKind::Pagination)?;
            overlap::<ProductDetail, _>(&self.product, url, ExtractorKind::Product)?;
            overlap::<ProductReview, _>(&self.review, url, ExtractorKind::Review)?;

            let listing = self.listing.iter().find(|e| e.can_handle(url));
            let product = self.product.iter().find(|e| e.can_handle(url));
            if let (Some(listing), Some(product)) = (listing, product) {
                return Err(ScraperError::OverlappingExtractors {
                    kind: "listing/product",
                    first: listing.retailer_slug().to_owned(),
                    second: product.retailer_slug().to_owned(),
                    url: (*url).to_owned(),
                });
            }
        }
        Ok(())
    }
}

fn single<'r, T, E: Extractor<T>>(
    extractors: &'r [E],
    url: &str,
    kind: ExtractorKind,
) -> Option<&'r E> {
    let mut matching = extractors.iter().filter(|e| e.can_handle(url));
    let first = matching.next();
    if let Some(other) = matching.next() {
        tracing::warn!(
            %kind,
            url,
            first = first.map_or("", |e| e.retailer_slug()),
            second = other.retailer_slug(),
            "more than one extractor matches; using the first"
        );
    }
    first
}

fn overlap<T, E: Extractor<T>>(
    extractors: &[E],
    url: &str,
    kind: ExtractorKind,
) -> Result<(), ScraperError> {
    let mut matching = extractors.iter().filter(|e| e.can_handle(url));
    if let (Some(first), Some(second)) = (matching.next(), matching.next()) {
        return Err(ScraperError::OverlappingExtractors {
            kind: kind.as_str(),
            first: first.retailer_slug().to_owned(),
            second: second.retailer_slug().to_owned(),
            url: url.to_owned(),
        });
    }
    Ok(())
}
