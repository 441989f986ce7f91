//! Declarative per-retailer extraction profiles.
//!
//! A [`RetailerProfile`] is plain data: host names, URL patterns and selector
//! lists. [`RetailerProfile::compile`] validates it once and produces the
//! [`CompiledProfile`] the extractors share.

use kibble_core::RetailerCatalog;
use regex::Regex;
use scraper::Html;
use url::Url;

use super::dom::{self, Locator};
use crate::brand::BrandMatcher;
use crate::category::CategoryInferer;
use crate::error::ScraperError;
use crate::urls;

/// Ordered selector candidates for every field the extractors read.
///
/// Entries are `"css"` for element text or `"css@attr"` for an attribute.
#[derive(Debug, Clone, Default)]
pub struct FieldSelectors<L = String> {
    pub title: Vec<L>,
    pub description: Vec<L>,
    pub brand: Vec<L>,
    pub price: Vec<L>,
    pub original_price: Vec<L>,
    pub size: Vec<L>,
    pub images: Vec<L>,
    pub ingredients: Vec<L>,
    /// Table rows or list items holding one nutrient each.
    pub nutrition_rows: Vec<L>,
    /// Free text such as `"Protein 26%, Fat content 14%"`.
    pub nutrition_text: Vec<L>,
    pub stock: Vec<L>,
    pub breadcrumbs: Vec<L>,
    pub external_id: Vec<L>,
    pub barcode: Vec<L>,

    pub product_links: Vec<L>,
    pub next_page: Vec<L>,
    pub page_links: Vec<L>,

    pub review_container: Vec<L>,
    pub review_id: Vec<L>,
    pub review_rating: Vec<L>,
    pub review_author: Vec<L>,
    pub review_title: Vec<L>,
    pub review_body: Vec<L>,
    pub review_date: Vec<L>,
    pub review_verified: Vec<L>,
    pub review_helpful: Vec<L>,
}

impl FieldSelectors<String> {
    /// Fallbacks that work on most storefronts: schema.org microdata, Open
    /// Graph meta tags and common class names. Retailer profiles put their own
    /// selectors in front of these.
    #[must_use]
    pub fn common() -> Self {
        Self {
            title: strings(&["[itemprop='name']", "h1", "meta[property='og:title']@content"]),
            description: strings(&[
                "[itemprop='description']",
                "meta[name='description']@content",
                "meta[property='og:description']@content",
            ]),
            brand: strings(&[
                "[itemprop='brand'] [itemprop='name']",
                "[itemprop='brand']@content",
                "[itemprop='brand']",
                "meta[property='product:brand']@content",
            ]),
            price: strings(&[
                "[itemprop='price']@content",
                "[itemprop='price']",
                "meta[property='product:price:amount']@content",
            ]),
            original_price: strings(&["[class*='was-price']", "[class*='original-price']", "s.price", "del"]),
            images: strings(&["meta[property='og:image']@content"]),
            stock: strings(&[
                "link[itemprop='availability']@href",
                "[itemprop='availability']@content",
                "[class*='stock']",
            ]),
            breadcrumbs: strings(&[
                "[itemtype*='BreadcrumbList'] [itemprop='name']",
                "nav[aria-label*='readcrumb'] li",
                ".breadcrumb li",
                ".breadcrumbs li",
            ]),
            external_id: strings(&[
                "[itemprop='sku']@content",
                "[itemprop='sku']",
                "[data-product-id]@data-product-id",
                "[data-sku]@data-sku",
            ]),
            barcode: strings(&[
                "[itemprop='gtin13']@content",
                "[itemprop='gtin13']",
                "[itemprop='gtin']@content",
            ]),
            next_page: strings(&["link[rel='next']@href", "a[rel='next']@href"]),
            review_container: strings(&["[itemprop='review']"]),
            review_rating: strings(&["[itemprop='ratingValue']@content", "[itemprop='ratingValue']"]),
            review_author: strings(&["[itemprop='author'] [itemprop='name']", "[itemprop='author']"]),
            review_title: strings(&["[itemprop='name']"]),
            review_body: strings(&["[itemprop='reviewBody']", "[itemprop='description']"]),
            review_date: strings(&["[itemprop='datePublished']@content", "[itemprop='datePublished']", "time@datetime"]),
            ..Self::default()
        }
    }

    /// Prepends retailer-specific candidates to each list in `self`.
    #[must_use]
    pub fn ahead_of(mut specific: Self, generic: Self) -> Self {
        macro_rules! chain {
            ($($field:ident),* $(,)?) => {
                $( specific.$field.extend(generic.$field); )*
            };
        }
        chain!(
            title, description, brand, price, original_price, size, images, ingredients,
            nutrition_rows, nutrition_text, stock, breadcrumbs, external_id, barcode,
            product_links, next_page, page_links, review_container, review_id, review_rating,
            review_author, review_title, review_body, review_date, review_verified, review_helpful,
        );
        specific
    }

    fn compile(&self, retailer: &str) -> Result<FieldSelectors<Locator>, ScraperError> {
        let c = |specs: &[String]| dom::compile_all(retailer, specs);
        Ok(FieldSelectors {
            title: c(&self.title)?,
            description: c(&self.description)?,
            brand: c(&self.brand)?,
            price: c(&self.price)?,
            original_price: c(&self.original_price)?,
            size: c(&self.size)?,
            images: c(&self.images)?,
            ingredients: c(&self.ingredients)?,
            nutrition_rows: c(&self.nutrition_rows)?,
            nutrition_text: c(&self.nutrition_text)?,
            stock: c(&self.stock)?,
            breadcrumbs: c(&self.breadcrumbs)?,
            external_id: c(&self.external_id)?,
            barcode: c(&self.barcode)?,
            product_links: c(&self.product_links)?,
            next_page: c(&self.next_page)?,
            page_links: c(&self.page_links)?,
            review_container: c(&self.review_container)?,
            review_id: c(&self.review_id)?,
            review_rating: c(&self.review_rating)?,
            review_author: c(&self.review_author)?,
            review_title: c(&self.review_title)?,
            review_body: c(&self.review_body)?,
            review_date: c(&self.review_date)?,
            review_verified: c(&self.review_verified)?,
            review_helpful: c(&self.review_helpful)?,
        })
    }
}

/// `&["a", "b"]` → owned selector list.
#[must_use]
pub fn strings(specs: &[&str]) -> Vec<String> {
    specs.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, Clone)]
pub struct RetailerProfile {
    pub slug: String,
    /// Currency assumed when the page does not state one.
    pub currency: String,
    /// Exact host names, lowercase.
    pub hosts: Vec<String>,
    /// Pattern over path and query identifying listing pages.
    pub listing_url: String,
    pub product_url: String,
    /// Pages carrying reviews; product pages when `None`.
    pub review_url: Option<String>,
    /// Capture group 1 over the path is the retailer's product id.
    pub external_id_url: Option<String>,
    /// Capture group 1 over the path is a category segment.
    pub category_segment: Option<String>,
    /// Breadcrumb position counted from the end used as category.
    pub breadcrumb_depth: usize,
    /// Scale bare review ratings are written on.
    pub rating_scale: f64,
    pub selectors: FieldSelectors,
}

impl RetailerProfile {
    #[must_use]
    pub fn new(slug: impl Into<String>, hosts: &[&str]) -> Self {
        Self {
            slug: slug.into(),
            currency: "GBP".to_owned(),
            hosts: hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            listing_url: String::from("^$"),
            product_url: String::from("^$"),
            review_url: None,
            external_id_url: None,
            category_segment: None,
            breadcrumb_depth: 0,
            rating_scale: 5.0,
            selectors: FieldSelectors::default(),
        }
    }

    /// Validates every pattern and selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] or
    /// [`ScraperError::InvalidSelector`] for the first bad entry.
    pub fn compile(&self, catalog: &RetailerCatalog) -> Result<CompiledProfile, ScraperError> {
        let pattern = |p: &str| {
            Regex::new(p).map_err(|source| ScraperError::InvalidPattern {
                retailer: self.slug.clone(),
                pattern: p.to_owned(),
                source,
            })
        };
        let product_url = pattern(&self.product_url)?;
        let review_url = match &self.review_url {
            Some(p) => pattern(p)?,
            None => product_url.clone(),
        };
        Ok(CompiledProfile {
            slug: self.slug.clone(),
            currency: self.currency.clone(),
            hosts: self.hosts.clone(),
            listing_url: pattern(&self.listing_url)?,
            product_url,
            review_url,
            external_id_url: self.external_id_url.as_deref().map(pattern).transpose()?,
            category_segment: self.category_segment.as_deref().map(pattern).transpose()?,
            breadcrumb_depth: self.breadcrumb_depth,
            rating_scale: self.rating_scale,
            selectors: self.selectors.compile(&self.slug)?,
            categories: CategoryInferer::new(catalog),
            brands: BrandMatcher::new(catalog, &self.slug),
        })
    }
}

/// A validated profile plus the catalog-derived lookups for its retailer.
#[derive(Debug)]
pub struct CompiledProfile {
    pub slug: String,
    pub currency: String,
    pub hosts: Vec<String>,
    pub listing_url: Regex,
    pub product_url: Regex,
    pub review_url: Regex,
    pub external_id_url: Option<Regex>,
    pub category_segment: Option<Regex>,
    pub breadcrumb_depth: usize,
    pub rating_scale: f64,
    pub selectors: FieldSelectors<Locator>,
    pub categories: CategoryInferer,
    pub brands: BrandMatcher,
}

impl CompiledProfile {
    /// `true` when `url` is on one of this retailer's hosts and its path and
    /// query match `pattern`.
    #[must_use]
    pub fn matches(&self, pattern: &Regex, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
            && pattern.is_match(&urls::path_and_query(&parsed))
    }

    #[must_use]
    pub fn owns_host(&self, url: &str) -> bool {
        urls::host_of(url).is_some_and(|host| self.hosts.contains(&host))
    }

    /// First capture of `pattern` over the URL path.
    #[must_use]
    pub fn capture_path(pattern: &Regex, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        pattern
            .captures(parsed.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    }

    /// Category from the profile's URL-segment override, if it names one.
    #[must_use]
    pub fn category_override(&self, url: &str) -> Option<String> {
        let pattern = self.category_segment.as_ref()?;
        let segment = Self::capture_path(pattern, url)?;
        self.categories.map_segment(&segment)
    }

    /// Category shared by everything found on a listing page: URL-segment
    /// override, then the breadcrumb trail, then the URL shape, then the
    /// keyword table.
    #[must_use]
    pub fn listing_category(&self, doc: &Html, url: &str) -> Option<String> {
        self.category_override(url)
            .or_else(|| {
                let trail = CategoryInferer::breadcrumbs_from_html(doc, &self.selectors.breadcrumbs);
                self.categories
                    .extract_from_breadcrumbs(&trail, self.breadcrumb_depth)
            })
            .or_else(|| self.categories.extract_from_url(url))
            .or_else(|| self.categories.extract_from_keywords(url))
    }
}
