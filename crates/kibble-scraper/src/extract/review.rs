//! Customer reviews on product pages.

use std::sync::Arc;

use kibble_core::{normalize_rating, Metadata, ProductReview};
use scraper::Html;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::dom;
use super::profile::CompiledProfile;
use super::structured::{self, scalar_field, text_field};
use super::{Extraction, Extractor};
use crate::parse::{parse_count, parse_rating_text, parse_review_date};

/// One review's raw fields, before validation.
#[derive(Debug, Default)]
struct RawReview {
    id: Option<String>,
    rating: Option<f64>,
    author: Option<String>,
    title: Option<String>,
    body: Option<String>,
    date: Option<String>,
    verified: bool,
    helpful: Option<String>,
    source: &'static str,
}

/// Yields reviews from the page's JSON-LD `review` array when present,
/// otherwise from the profile's review containers.
///
/// Reviews without a rating, or with neither body nor title, are skipped.
pub struct ReviewExtractor {
    profile: Arc<CompiledProfile>,
}

impl ReviewExtractor {
    #[must_use]
    pub fn new(profile: Arc<CompiledProfile>) -> Self {
        Self { profile }
    }

    fn from_structured(&self, node: &Value) -> RawReview {
        let rating = node.get("reviewRating").and_then(|r| {
            let value = scalar_field(r, "ratingValue")?;
            let value: f64 = value.replace(',', ".").parse().ok()?;
            let scale = scalar_field(r, "bestRating")
                .and_then(|b| b.parse::<f64>().ok())
                .unwrap_or(self.profile.rating_scale);
            normalize_rating(value, scale)
        });
        let author = match node.get("author") {
            Some(Value::String(s)) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
            Some(other) => text_field(other, "name"),
            None => None,
        };
        RawReview {
            id: scalar_field(node, "@id").or_else(|| scalar_field(node, "identifier")),
            rating,
            author,
            title: text_field(node, "name").or_else(|| text_field(node, "headline")),
            body: text_field(node, "reviewBody").or_else(|| text_field(node, "description")),
            date: text_field(node, "datePublished"),
            verified: false,
            helpful: None,
            source: "structured",
        }
    }

    fn from_fragment(&self, fragment: &str) -> RawReview {
        let doc = Html::parse_fragment(fragment);
        let root = doc.root_element();
        let s = &self.profile.selectors;
        let scale = self.profile.rating_scale;
        RawReview {
            id: dom::first_value(root, &s.review_id, dom::non_empty),
            rating: dom::first_value(root, &s.review_rating, |v| {
                parse_rating_text(v, scale).is_some()
            })
            .and_then(|v| parse_rating_text(&v, scale)),
            author: dom::first_value(root, &s.review_author, dom::non_empty),
            title: dom::first_value(root, &s.review_title, dom::non_empty),
            body: dom::first_value(root, &s.review_body, dom::non_empty),
            date: dom::first_value(root, &s.review_date, |v| parse_review_date(v).is_some()),
            verified: dom::exists(root, &s.review_verified),
            helpful: dom::first_value(root, &s.review_helpful, |v| parse_count(v).is_some()),
            source: "dom",
        }
    }

    fn finish(&self, raw: RawReview, url: &str) -> Option<ProductReview> {
        let Some(rating) = raw.rating else {
            tracing::debug!(retailer = %self.profile.slug, url, "review without rating skipped");
            return None;
        };
        let body = raw.body.unwrap_or_default();
        if body.is_empty() && raw.title.is_none() {
            tracing::debug!(retailer = %self.profile.slug, url, "empty review skipped");
            return None;
        }
        let review_date = raw.date.as_deref().and_then(parse_review_date);
        let external_id = raw.id.unwrap_or_else(|| {
            fallback_id(&[
                self.profile.slug.as_str(),
                url,
                raw.author.as_deref().unwrap_or(""),
                raw.date.as_deref().unwrap_or(""),
                body.as_str(),
            ])
        });
        let mut metadata = Metadata::new();
        metadata.insert("source".to_owned(), Value::from(raw.source));
        metadata.insert("product_url".to_owned(), Value::from(url));
        Some(ProductReview {
            external_id,
            rating,
            author: raw.author,
            title: raw.title,
            body,
            verified_purchase: raw.verified,
            review_date,
            helpful_count: raw.helpful.as_deref().and_then(parse_count).unwrap_or(0),
            metadata: Some(metadata),
        })
    }
}

/// Stable id for reviews the retailer does not number: a SHA-256 prefix over
/// the fields that identify the review.
fn fallback_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f_u8]);
    }
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("gen-{hex}")
}

impl Extractor<ProductReview> for ReviewExtractor {
    fn retailer_slug(&self) -> &str {
        &self.profile.slug
    }

    fn can_handle(&self, url: &str) -> bool {
        self.profile.matches(&self.profile.review_url, url)
    }

    fn extract<'a>(&'a self, html: &'a str, url: &'a str) -> Extraction<'a, ProductReview> {
        enum Source {
            Structured(Vec<Value>),
            Fragments(Vec<String>),
        }

        let source = {
            let doc = Html::parse_document(html);
            let structured = structured::find_product(&doc)
                .map(|product| product.reviews())
                .unwrap_or_default();
            if structured.is_empty() {
                let containers = &self.profile.selectors.review_container;
                let fragments = containers
                    .iter()
                    .map(|locator| {
                        locator
                            .select(doc.root_element())
                            .map(|el| el.html())
                            .collect::<Vec<_>>()
                    })
                    .find(|found| !found.is_empty())
                    .unwrap_or_default();
                Source::Fragments(fragments)
            } else {
                Source::Structured(structured)
            }
        };

        match source {
            Source::Structured(nodes) => Box::new(
                nodes
                    .into_iter()
                    .filter_map(move |node| self.finish(self.from_structured(&node), url)),
            ),
            Source::Fragments(fragments) => Box::new(
                fragments
                    .into_iter()
                    .filter_map(move |fragment| self.finish(self.from_fragment(&fragment), url)),
            ),
        }
    }
}
