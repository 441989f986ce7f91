//! Product detail pages.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use kibble_core::{parse_price_pence, Metadata, ProductDetail, ProductImage};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

use super::dom::{self, Locator};
use super::profile::CompiledProfile;
use super::structured::{self, StructuredProduct};
use super::{Extraction, Extractor};
use crate::category::CategoryInferer;
use crate::error::ParseError;
use crate::parse::{
    find_gtin, parse_pack_size, parse_stock_quantity, stock_signal, PackSize, StockSignal,
};
use crate::urls::resolve_href;

static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

/// `"Protein 26%"`, `"Fat content: 14 %"`, `"Vitamin D3 (IU/kg) 1500"`.
static NUTRIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z][a-z0-9 ()/\-]*?)\s*:?\s*(\d[\d.,]*\s*(?:%|mg/kg|iu/kg|iu|kcal/kg|kcal|mg|g)?)\s*$")
        .expect("valid regex")
});

const STRUCTURED: &str = "structured";
const DOM: &str = "dom";

/// Records which path supplied each field.
#[derive(Default)]
struct Provenance(Map<String, Value>);

impl Provenance {
    /// Structured value when present, otherwise the DOM fallback.
    fn pick<T>(
        &mut self,
        field: &str,
        structured: Option<T>,
        dom: impl FnOnce() -> Option<T>,
    ) -> Option<T> {
        if let Some(value) = structured {
            self.note(field, STRUCTURED);
            return Some(value);
        }
        let value = dom()?;
        self.note(field, DOM);
        Some(value)
    }

    fn note(&mut self, field: &str, source: &str) {
        self.0.insert(field.to_owned(), Value::from(source));
    }
}

pub struct ProductExtractor {
    profile: Arc<CompiledProfile>,
}

impl ProductExtractor {
    #[must_use]
    pub fn new(profile: Arc<CompiledProfile>) -> Self {
        Self { profile }
    }

    fn extract_detail(&self, html: &str, url: &str) -> Option<ProductDetail> {
        let Ok(base) = Url::parse(url) else {
            tracing::debug!(url, "product URL does not parse");
            return None;
        };
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let profile = &*self.profile;
        let s = &profile.selectors;
        let structured = structured::find_product(&doc);
        let sd = structured.as_ref();
        let mut sources = Provenance::default();

        let Some(title) = sources.pick(
            "title",
            sd.and_then(StructuredProduct::name),
            || dom::first_value(root, &s.title, dom::non_empty),
        ) else {
            tracing::debug!(retailer = %profile.slug, url, "no product title; skipping page");
            return None;
        };

        let Some(price_pence) = sources.pick(
            "price",
            sd.and_then(StructuredProduct::price_pence),
            || dom_price(root, &s.price),
        ) else {
            tracing::debug!(
                retailer = %profile.slug,
                url,
                error = %ParseError::new("price", "no parseable price on page"),
                "skipping product page"
            );
            return None;
        };

        let currency = sd
            .and_then(StructuredProduct::currency)
            .unwrap_or_else(|| profile.currency.clone());
        let mut detail = ProductDetail::new(title, price_pence, currency);

        detail.original_price_pence = sources.pick(
            "original_price",
            sd.and_then(StructuredProduct::original_price_pence),
            || dom_price(root, &s.original_price),
        );
        detail.description = sources.pick(
            "description",
            sd.and_then(StructuredProduct::description),
            || dom::first_value(root, &s.description, dom::non_empty),
        );
        detail.brand = self.brand(root, sd, &detail.title, &mut sources);

        let mut metadata = Metadata::new();
        let pack = self.pack_size(root, &detail.title);
        detail.weight_grams = pack.weight_grams;
        detail.quantity = pack.quantity;
        if let Some(unit) = pack.weight_unit {
            metadata.insert("weight_unit".to_owned(), Value::from(unit));
        }

        detail.images = sources
            .pick(
                "images",
                sd.map(|p| structured_images(p, &base)).filter(|imgs| !imgs.is_empty()),
                || Some(dom_images(root, &s.images, &base)).filter(|imgs| !imgs.is_empty()),
            )
            .unwrap_or_default();
        detail.ingredients = dom::first_value(root, &s.ingredients, dom::non_empty)
            .map(|text| strip_label(&text, &["ingredients", "composition"]));
        detail.nutritional_info = nutrition(root, &s.nutrition_rows, &s.nutrition_text);

        let stock_texts = all_values(root, &s.stock);
        let out_of_stock = sd
            .and_then(StructuredProduct::availability)
            .into_iter()
            .chain(stock_texts.iter().filter_map(|t| stock_signal(t)))
            .any(|signal| signal == StockSignal::OutOfStock);
        detail.in_stock = !out_of_stock;
        detail.stock_quantity = stock_texts.iter().find_map(|t| parse_stock_quantity(t));

        detail.external_id = self.external_id(root, sd, url, &mut sources);
        detail.barcode = sources.pick("barcode", sd.and_then(StructuredProduct::gtin), || {
            dom::first_value(root, &s.barcode, |v| find_gtin(v).is_some()).and_then(|v| find_gtin(&v))
        });
        detail.category = self.category(&doc, url);

        metadata.insert("retailer".to_owned(), Value::from(profile.slug.clone()));
        metadata.insert("url".to_owned(), Value::from(url));
        metadata.insert("sources".to_owned(), Value::Object(sources.0));
        detail.metadata = Some(metadata);

        tracing::debug!(
            retailer = %profile.slug,
            url,
            title = %detail.title,
            price_pence = detail.price_pence,
            "extracted product"
        );
        Some(detail)
    }

    fn brand(
        &self,
        root: ElementRef<'_>,
        sd: Option<&StructuredProduct>,
        title: &str,
        sources: &mut Provenance,
    ) -> Option<String> {
        let brands = &self.profile.brands;
        let found = sources.pick(
            "brand",
            sd.and_then(StructuredProduct::brand).filter(|b| brands.is_plausible(b)),
            || dom::first_value(root, &self.profile.selectors.brand, |v| brands.is_plausible(v)),
        );
        if let Some(found) = found {
            return Some(brands.canonicalize(&found));
        }
        let matched = brands.find_in(title)?;
        sources.note("brand", "title");
        Some(matched)
    }

    fn pack_size(&self, root: ElementRef<'_>, title: &str) -> PackSize {
        let from_title = parse_pack_size(title);
        if from_title.weight_grams.is_some() {
            return from_title;
        }
        let from_label = all_values(root, &self.profile.selectors.size)
            .iter()
            .map(|label| parse_pack_size(label))
            .find(|size| !size.is_empty())
            .unwrap_or_default();
        PackSize {
            weight_grams: from_label.weight_grams,
            weight_unit: from_label.weight_unit,
            quantity: from_title.quantity.or(from_label.quantity),
        }
    }

    fn external_id(
        &self,
        root: ElementRef<'_>,
        sd: Option<&StructuredProduct>,
        url: &str,
        sources: &mut Provenance,
    ) -> Option<String> {
        if let Some(id) = self
            .profile
            .external_id_url
            .as_ref()
            .and_then(|pattern| CompiledProfile::capture_path(pattern, url))
        {
            sources.note("external_id", "url");
            return Some(id);
        }
        sources.pick("external_id", sd.and_then(StructuredProduct::sku), || {
            dom::first_value(root, &self.profile.selectors.external_id, dom::non_empty)
        })
    }

    fn category(&self, doc: &Html, url: &str) -> Option<String> {
        let profile = &*self.profile;
        profile
            .category_override(url)
            .or_else(|| {
                let trail = CategoryInferer::breadcrumbs_from_html(doc, &profile.selectors.breadcrumbs);
                profile
                    .categories
                    .extract_from_breadcrumbs(&trail, profile.breadcrumb_depth)
            })
            .or_else(|| profile.categories.extract_from_keywords(url))
    }
}

impl Extractor<ProductDetail> for ProductExtractor {
    fn retailer_slug(&self) -> &str {
        &self.profile.slug
    }

    fn can_handle(&self, url: &str) -> bool {
        self.profile.matches(&self.profile.product_url, url)
    }

    fn extract<'a>(&'a self, html: &'a str, url: &'a str) -> Extraction<'a, ProductDetail> {
        Box::new(std::iter::once_with(move || self.extract_detail(html, url)).flatten())
    }
}

/// First value of the cascade that parses as a price.
fn dom_price(root: ElementRef<'_>, locators: &[Locator]) -> Option<i64> {
    dom::first_value(root, locators, |v| parse_price_pence(v).is_some())
        .and_then(|v| parse_price_pence(&v))
}

/// Every value of every locator, in locator order.
fn all_values(root: ElementRef<'_>, locators: &[Locator]) -> Vec<String> {
    locators
        .iter()
        .flat_map(|locator| locator.select(root).filter_map(|el| locator.value_of(el)))
        .collect()
}

fn structured_images(product: &StructuredProduct, base: &Url) -> Vec<ProductImage> {
    let mut seen = HashSet::new();
    product
        .images()
        .into_iter()
        .filter_map(|img| {
            let url = resolve_href(base, &img.url)?.to_string();
            seen.insert(url.clone()).then_some(ProductImage {
                url,
                alt_text: img.alt_text,
                is_primary: false,
                width: img.width,
                height: img.height,
            })
        })
        .enumerate()
        .map(mark_primary)
        .collect()
}

fn dom_images(root: ElementRef<'_>, locators: &[Locator], base: &Url) -> Vec<ProductImage> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for locator in locators {
        for el in locator.select(root) {
            let raw = match locator.attr() {
                Some(_) => locator.value_of(el),
                None => el
                    .value()
                    .attr("src")
                    .or_else(|| el.value().attr("data-src"))
                    .map(str::to_owned),
            };
            let Some(url) = raw.and_then(|raw| resolve_href(base, &raw)) else {
                continue;
            };
            let url = url.to_string();
            if !seen.insert(url.clone()) {
                continue;
            }
            images.push(ProductImage {
                url,
                alt_text: el
                    .value()
                    .attr("alt")
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                    .map(str::to_owned),
                is_primary: false,
                width: el.value().attr("width").and_then(|w| w.trim().parse().ok()),
                height: el.value().attr("height").and_then(|h| h.trim().parse().ok()),
            });
        }
        if !images.is_empty() {
            break;
        }
    }
    images.into_iter().enumerate().map(mark_primary).collect()
}

fn mark_primary((index, mut image): (usize, ProductImage)) -> ProductImage {
    image.is_primary = index == 0;
    image
}

/// Nutrient name → value from table rows, falling back to free text such as
/// `"Analytical constituents: Protein 26%, Fat content 14%"`.
fn nutrition(
    root: ElementRef<'_>,
    rows: &[Locator],
    text: &[Locator],
) -> Option<BTreeMap<String, String>> {
    let mut table = BTreeMap::new();
    for locator in rows {
        for row in locator.select(root) {
            let cells: Vec<String> = row
                .select(&CELL_SELECTOR)
                .map(dom::element_text)
                .filter(|c| !c.is_empty())
                .collect();
            let pair = match cells.as_slice() {
                [key, value, ..] => Some((key.clone(), value.clone())),
                _ => dom::element_text(row)
                    .split_once(':')
                    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned())),
            };
            if let Some((key, value)) = pair.filter(|(k, v)| !k.is_empty() && !v.is_empty()) {
                table.insert(key, value);
            }
        }
        if !table.is_empty() {
            return Some(table);
        }
    }

    let free_text = dom::first_value(root, text, dom::non_empty)?;
    for part in free_text.split([',', ';']) {
        if let Some(caps) = NUTRIENT_RE.captures(part.trim()) {
            table.insert(caps[1].trim().to_owned(), caps[2].trim().to_owned());
        }
    }
    (!table.is_empty()).then_some(table)
}

/// Drops a leading `"Ingredients:"` style label.
fn strip_label(text: &str, labels: &[&str]) -> String {
    let lowered = text.to_lowercase();
    for label in labels {
        if lowered.starts_with(label) {
            if let Some((_, rest)) = text.split_once(':') {
                return rest.trim().to_owned();
            }
        }
    }
    text.trim().to_owned()
}
