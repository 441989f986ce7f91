//! Category and search listing pages.

use std::collections::HashSet;
use std::sync::Arc;

use kibble_core::{ListingUrl, Metadata};
use scraper::Html;
use serde_json::Value;
use url::Url;

use super::dom;
use super::profile::CompiledProfile;
use super::{Extraction, Extractor};
use crate::urls::resolve_href;

/// Yields the product pages linked from a listing page, in page order.
///
/// Links are made absolute, stripped of fragments and deduplicated; only
/// links this retailer's product extractor would accept are kept.
pub struct ListingExtractor {
    profile: Arc<CompiledProfile>,
}

impl ListingExtractor {
    #[must_use]
    pub fn new(profile: Arc<CompiledProfile>) -> Self {
        Self { profile }
    }
}

impl Extractor<ListingUrl> for ListingExtractor {
    fn retailer_slug(&self) -> &str {
        &self.profile.slug
    }

    fn can_handle(&self, url: &str) -> bool {
        self.profile.matches(&self.profile.listing_url, url)
    }

    fn extract<'a>(&'a self, html: &'a str, url: &'a str) -> Extraction<'a, ListingUrl> {
        let Ok(base) = Url::parse(url) else {
            tracing::debug!(url, "listing URL does not parse");
            return Box::new(std::iter::empty());
        };
        // `Html` is not kept past this point; only owned strings flow into the
        // returned iterator.
        let (hrefs, category) = {
            let doc = Html::parse_document(html);
            let hrefs = dom::values(doc.root_element(), &self.profile.selectors.product_links);
            (hrefs, self.profile.listing_category(&doc, url))
        };
        tracing::debug!(
            retailer = %self.profile.slug,
            url,
            links = hrefs.len(),
            category = category.as_deref().unwrap_or("-"),
            "parsed listing page"
        );

        let mut seen = HashSet::new();
        let profile = &self.profile;
        Box::new(
            hrefs
                .into_iter()
                .filter_map(move |href| resolve_href(&base, &href))
                .map(|resolved| resolved.to_string())
                .filter(move |link| profile.matches(&profile.product_url, link))
                .filter(move |link| seen.insert(link.clone()))
                .enumerate()
                .map(move |(position, link)| {
                    let mut metadata = Metadata::new();
                    metadata.insert("position".to_owned(), Value::from(position + 1));
                    metadata.insert("source_url".to_owned(), Value::from(url));
                    ListingUrl {
                        url: link,
                        retailer_slug: profile.slug.clone(),
                        category: category.clone(),
                        metadata,
                    }
                }),
        )
    }
}
