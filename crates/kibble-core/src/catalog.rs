//! Retailer catalog: the lookup tables the extraction core consumes.
//!
//! Loaded once from `config/retailers.yaml` and passed explicitly to the
//! fetcher, extractors and projector. Nothing here is global state.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One retailer the crawler knows how to visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerConfig {
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    /// Hostnames served by this retailer, without scheme.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Advisory delay between successive requests, applied by the caller.
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
    /// Retailer-specific request headers layered over the catalog defaults.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RetailerConfig {
    /// The configured slug, or a URL-safe slug generated from the name.
    #[must_use]
    pub fn slug(&self) -> String {
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            return slug.trim().to_string();
        }
        slugify(&self.name)
    }
}

/// A brand name the inference step may recognise in free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Canonical display name, e.g. `"James Wellbeloved"`.
    pub name: String,
    /// Alternative spellings valid on every retailer.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Extra spellings that only one retailer uses, keyed by retailer slug.
    #[serde(default)]
    pub retailer_aliases: BTreeMap<String, Vec<String>>,
}

/// Maps a keyword found in a URL onto a category label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeyword {
    pub keyword: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetailerCatalog {
    /// Headers sent to every retailer on top of the built-in browser set.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Breadcrumb labels too broad to serve as a category ("Home", "Shop").
    #[serde(default)]
    pub generic_terms: Vec<String>,
    /// Ordered; the first keyword contained in a URL wins.
    #[serde(default)]
    pub category_keywords: Vec<CategoryKeyword>,
    #[serde(default)]
    pub brands: Vec<BrandConfig>,
    #[serde(default)]
    pub retailers: Vec<RetailerConfig>,
}

impl RetailerCatalog {
    /// Parse and validate a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let catalog: RetailerCatalog =
            serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    #[must_use]
    pub fn retailer(&self, slug: &str) -> Option<&RetailerConfig> {
        self.retailers.iter().find(|r| r.slug() == slug)
    }

    #[must_use]
    pub fn is_known_retailer(&self, slug: &str) -> bool {
        self.retailer(slug).is_some()
    }

    #[must_use]
    pub fn retailer_slugs(&self) -> Vec<String> {
        self.retailers.iter().map(RetailerConfig::slug).collect()
    }

    /// Delay to leave between two requests to `slug`, falling back to
    /// `default_ms` for unknown retailers or retailers without their own value.
    #[must_use]
    pub fn request_delay(&self, slug: &str, default_ms: u64) -> Duration {
        let ms = self
            .retailer(slug)
            .and_then(|r| r.request_delay_ms)
            .unwrap_or(default_ms);
        Duration::from_millis(ms)
    }

    /// Catalog default headers overlaid with the retailer's own set.
    /// Retailer values win on a case-insensitive name clash.
    #[must_use]
    pub fn headers_for(&self, slug: &str) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = self
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(retailer) = self.retailer(slug) {
            for (name, value) in &retailer.headers {
                merged.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
                merged.push((name.clone(), value.clone()));
            }
        }
        merged
    }

    /// `(alias, canonical name)` pairs usable on `slug`, longest alias first so
    /// "James Wellbeloved" beats "James".
    #[must_use]
    pub fn brand_aliases_for(&self, slug: &str) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for brand in &self.brands {
            pairs.push((brand.name.clone(), brand.name.clone()));
            for alias in &brand.aliases {
                pairs.push((alias.clone(), brand.name.clone()));
            }
            if let Some(extra) = brand.retailer_aliases.get(slug) {
                for alias in extra {
                    pairs.push((alias.clone(), brand.name.clone()));
                }
            }
        }
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        pairs
    }

    #[must_use]
    pub fn is_generic_term(&self, label: &str) -> bool {
        let label = label.trim();
        self.generic_terms
            .iter()
            .any(|term| term.eq_ignore_ascii_case(label))
    }
}

/// Load and validate the retailer catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<RetailerCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    RetailerCatalog::from_yaml_str(&content)
}

fn validate_catalog(catalog: &RetailerCatalog) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();
    for retailer in &catalog.retailers {
        if retailer.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "retailer name must be non-empty".to_string(),
            ));
        }
        let slug = retailer.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' produces an empty slug",
                retailer.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate retailer slug: '{}' (from retailer '{}')",
                slug, retailer.name
            )));
        }
    }

    let mut seen_brands = HashSet::new();
    for brand in &catalog.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }
        if !seen_brands.insert(brand.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }
        if let Some(unknown) = brand
            .retailer_aliases
            .keys()
            .find(|slug| !seen_slugs.contains(*slug))
        {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has aliases for unknown retailer '{unknown}'",
                brand.name
            )));
        }
    }

    if catalog
        .category_keywords
        .iter()
        .any(|k| k.keyword.trim().is_empty() || k.category.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "category keywords and categories must be non-empty".to_string(),
        ));
    }

    Ok(())
}

/// Generate a URL-safe slug: lowercase ASCII alphanumerics joined by single
/// dashes. Non-ASCII characters are dropped.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
