//! Further pages of a paginated listing.

use std::collections::HashSet;
use std::sync::Arc;

use kibble_core::PaginatedListingUrl;
use scraper::Html;
use url::Url;

use super::dom;
use super::profile::CompiledProfile;
use super::{Extraction, Extractor};
use crate::urls::{page_number, resolve_href};

/// Reads `rel=next` and numbered page links from a listing page.
///
/// Every yielded page is another listing page of the same retailer, never the
/// page being read, and appears once.
pub struct PaginationExtractor {
    profile: Arc<CompiledProfile>,
}

impl PaginationExtractor {
    #[must_use]
    pub fn new(profile: Arc<CompiledProfile>) -> Self {
        Self { profile }
    }
}

impl Extractor<PaginatedListingUrl> for PaginationExtractor {
    fn retailer_slug(&self) -> &str {
        &self.profile.slug
    }

    fn can_handle(&self, url: &str) -> bool {
        self.profile.matches(&self.profile.listing_url, url)
    }

    fn extract<'a>(&'a self, html: &'a str, url: &'a str) -> Extraction<'a, PaginatedListingUrl> {
        let Ok(current) = Url::parse(url) else {
            return Box::new(std::iter::empty());
        };
        let selectors = &self.profile.selectors;
        let (next_links, page_links, category) = {
            let doc = Html::parse_document(html);
            let root = doc.root_element();
            (
                dom::values(root, &selectors.next_page),
                dom::values(root, &selectors.page_links),
                self.profile.listing_category(&doc, url),
            )
        };
        let current_page = page_number(&current).unwrap_or(1);

        let candidates = next_links
            .into_iter()
            .map(|href| (href, true))
            .chain(page_links.into_iter().map(|href| (href, false)));

        let mut seen: HashSet<String> = HashSet::from([current.to_string()]);
        let profile = &self.profile;
        Box::new(candidates.filter_map(move |(href, is_next)| {
            let resolved = resolve_href(&current, &href)?;
            let link = resolved.to_string();
            if !profile.matches(&profile.listing_url, &link) {
                return None;
            }
            let page = match page_number(&resolved) {
                Some(n) => n,
                None if is_next => current_page.checked_add(1)?,
                None => return None,
            };
            if page == current_page || !seen.insert(link.clone()) {
                return None;
            }
            Some(PaginatedListingUrl {
                url: link,
                retailer_slug: profile.slug.clone(),
                page_number: page,
                category: category.clone(),
                discovered_from: Some(url.to_owned()),
            })
        }))
    }
}
