//! schema.org JSON-LD product annotations.

use std::sync::LazyLock;

use kibble_core::money::json_price_pence;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::ParseError;
use crate::parse::{is_valid_gtin, StockSignal};

static JSONLD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

const PRODUCT_TYPES: &[&str] = &["Product", "ProductGroup", "IndividualProduct", "ProductModel"];

/// Every JSON-LD node on the page. Top-level arrays and `@graph` containers
/// are flattened. Blocks that fail to parse are logged and skipped.
#[must_use]
pub fn json_ld_nodes(doc: &Html) -> Vec<Value> {
    let mut nodes = Vec::new();
    for script in doc.select(&JSONLD_SELECTOR) {
        let text = script.text().collect::<String>();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %ParseError::new("json-ld", e.to_string()), "skipping malformed JSON-LD block");
                continue;
            }
        };
        flatten_into(value, &mut nodes);
    }
    nodes
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_into(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// `@type` may be a plain string or an array of strings.
#[must_use]
pub fn has_type(node: &Value, accepted: &[&str]) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => accepted.iter().any(|t| s.eq_ignore_ascii_case(t)),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| accepted.iter().any(|t| s.eq_ignore_ascii_case(t))),
        _ => false,
    }
}

/// First product node on the page.
#[must_use]
pub fn find_product(doc: &Html) -> Option<StructuredProduct> {
    json_ld_nodes(doc)
        .into_iter()
        .find(|node| has_type(node, PRODUCT_TYPES))
        .map(StructuredProduct)
}

/// Image reference from structured data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredImage {
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Typed read access over a JSON-LD `Product` node.
#[derive(Debug, Clone)]
pub struct StructuredProduct(pub Value);

impl StructuredProduct {
    #[must_use]
    pub fn name(&self) -> Option<String> {
        text_field(&self.0, "name")
    }

    #[must_use]
    pub fn description(&self) -> Option<String> {
        text_field(&self.0, "description")
    }

    /// `brand` as a string, or the `name` of a `Brand`/`Organization` node.
    #[must_use]
    pub fn brand(&self) -> Option<String> {
        match self.0.get("brand")? {
            Value::String(s) => non_blank(s),
            Value::Array(items) => items.iter().find_map(|b| match b {
                Value::String(s) => non_blank(s),
                other => text_field(other, "name"),
            }),
            other => text_field(other, "name"),
        }
    }

    /// Product SKU, then the first offer's SKU, then `productID`.
    #[must_use]
    pub fn sku(&self) -> Option<String> {
        scalar_field(&self.0, "sku")
            .or_else(|| self.offers().iter().find_map(|o| scalar_field(o, "sku")))
            .or_else(|| scalar_field(&self.0, "productID"))
    }

    /// First `gtin*` property that is a valid GTIN.
    #[must_use]
    pub fn gtin(&self) -> Option<String> {
        let nodes = std::iter::once(&self.0).chain(self.offers());
        for node in nodes {
            for key in ["gtin13", "gtin", "gtin14", "gtin12", "gtin8", "ean"] {
                let Some(raw) = scalar_field(node, key) else {
                    continue;
                };
                let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
                if is_valid_gtin(&digits) {
                    return Some(digits);
                }
                tracing::debug!(error = %ParseError::new("gtin", format!("invalid check digit in {raw}")), "ignoring structured barcode");
            }
        }
        None
    }

    #[must_use]
    pub fn images(&self) -> Vec<StructuredImage> {
        let Some(image) = self.0.get("image") else {
            return Vec::new();
        };
        let items: Vec<&Value> = match image {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(url) => non_blank(url).map(|url| StructuredImage {
                    url,
                    alt_text: None,
                    width: None,
                    height: None,
                }),
                Value::Object(_) => {
                    let url = text_field(item, "contentUrl").or_else(|| text_field(item, "url"))?;
                    Some(StructuredImage {
                        url,
                        alt_text: text_field(item, "caption").or_else(|| text_field(item, "name")),
                        width: dimension(item.get("width")),
                        height: dimension(item.get("height")),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// `offers` as a list: a single offer, an array of offers, or an
    /// `AggregateOffer`'s nested `offers`. A product group without its own
    /// offers contributes its first variant's.
    #[must_use]
    pub fn offers(&self) -> Vec<&Value> {
        let offers = self.0.get("offers").or_else(|| {
            self.0
                .get("hasVariant")
                .and_then(Value::as_array)
                .and_then(|variants| variants.first())
                .and_then(|variant| variant.get("offers"))
        });
        let mut out = Vec::new();
        match offers {
            Some(Value::Array(items)) => out.extend(items.iter()),
            Some(offer @ Value::Object(_)) => {
                out.push(offer);
                if let Some(Value::Array(nested)) = offer.get("offers") {
                    out.extend(nested.iter());
                }
            }
            _ => {}
        }
        out
    }

    /// Current price in pence: the first offer with a parseable `price`,
    /// falling back to an aggregate `lowPrice`.
    #[must_use]
    pub fn price_pence(&self) -> Option<i64> {
        let offers = self.offers();
        offers
            .iter()
            .find_map(|o| o.get("price").and_then(json_price_pence))
            .or_else(|| {
                offers
                    .iter()
                    .find_map(|o| o.get("priceSpecification").and_then(current_spec_price))
            })
            .or_else(|| offers.iter().find_map(|o| o.get("lowPrice").and_then(json_price_pence)))
    }

    /// Pre-sale price from a `StrikethroughPrice`/`ListPrice` specification.
    #[must_use]
    pub fn original_price_pence(&self) -> Option<i64> {
        self.offers().iter().find_map(|offer| {
            let specs: Vec<&Value> = match offer.get("priceSpecification")? {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            specs.into_iter().find_map(|spec| {
                let kind = spec.get("priceType").and_then(Value::as_str)?;
                (kind.contains("StrikethroughPrice") || kind.contains("ListPrice"))
                    .then(|| spec.get("price").and_then(json_price_pence))
                    .flatten()
            })
        })
    }

    #[must_use]
    pub fn currency(&self) -> Option<String> {
        self.offers().iter().find_map(|o| {
            scalar_field(o, "priceCurrency").or_else(|| {
                o.get("priceSpecification")
                    .and_then(|spec| scalar_field(spec, "priceCurrency"))
            })
        })
    }

    /// Availability of the first offer that declares one.
    #[must_use]
    pub fn availability(&self) -> Option<StockSignal> {
        let raw = self
            .offers()
            .iter()
            .find_map(|o| scalar_field(o, "availability"))?;
        let term = raw.rsplit('/').next().unwrap_or(&raw).to_ascii_lowercase();
        match term.as_str() {
            "outofstock" | "soldout" | "discontinued" => Some(StockSignal::OutOfStock),
            "instock" | "limitedavailability" | "onlineonly" | "instoreonly" | "preorder"
            | "presale" | "backorder" => Some(StockSignal::InStock),
            _ => None,
        }
    }

    /// Embedded `review` nodes.
    #[must_use]
    pub fn reviews(&self) -> Vec<Value> {
        match self.0.get("review").or_else(|| self.0.get("reviews")) {
            Some(Value::Array(items)) => items.iter().filter(|v| v.is_object()).cloned().collect(),
            Some(review @ Value::Object(_)) => vec![review.clone()],
            _ => Vec::new(),
        }
    }
}

fn current_spec_price(spec: &Value) -> Option<i64> {
    let specs: Vec<&Value> = match spec {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    specs
        .into_iter()
        .filter(|s| {
            !s.get("priceType")
                .and_then(Value::as_str)
                .is_some_and(|t| t.contains("StrikethroughPrice") || t.contains("ListPrice"))
        })
        .find_map(|s| s.get("price").and_then(json_price_pence))
}

/// Non-blank string field.
#[must_use]
pub fn text_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).and_then(non_blank)
}

/// String or number field rendered as text.
#[must_use]
pub fn scalar_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = crate::parse::collapse_whitespace(s);
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Pixel dimension given as a number, a numeric string, or a
/// `QuantitativeValue`.
fn dimension(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().trim_end_matches("px").parse().ok(),
        Value::Object(_) => dimension(value?.get("value")),
        _ => None,
    }
}
