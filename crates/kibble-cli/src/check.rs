//! `check-config` command handler.

use kibble_core::{AppConfig, RetailerCatalog};
use kibble_scraper::ExtractorRegistry;

/// Profiles without a catalog entry and catalog entries without a profile.
fn unmatched<'a>(
    catalog: &'a RetailerCatalog,
    profiles: &[&'a str],
) -> (Vec<&'a str>, Vec<String>) {
    let missing_in_catalog = profiles
        .iter()
        .copied()
        .filter(|slug| !catalog.is_known_retailer(slug))
        .collect();
    let missing_profile = catalog
        .retailer_slugs()
        .into_iter()
        .filter(|slug| !profiles.contains(&slug.as_str()))
        .collect();
    (missing_in_catalog, missing_profile)
}

/// Loads the catalog, builds the built-in extractor registry and reports
/// what was found.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the registry fails
/// validation.
pub(crate) fn run_check_config(config: &AppConfig) -> anyhow::Result<()> {
    println!("{config:#?}");

    let catalog = crate::load_catalog(config)?;
    println!(
        "catalog: {} retailers, {} brands, {} category keywords, {} generic terms",
        catalog.retailers.len(),
        catalog.brands.len(),
        catalog.category_keywords.len(),
        catalog.generic_terms.len()
    );

    let registry = ExtractorRegistry::with_builtin_profiles(&catalog)?;
    let profiles = registry.retailer_slugs();
    println!("profiles: {}", profiles.join(", "));

    let (missing_in_catalog, missing_profile) = unmatched(&catalog, &profiles);
    for slug in missing_in_catalog {
        println!("warning: profile '{slug}' has no catalog entry; defaults apply");
    }
    for slug in missing_profile {
        println!("warning: catalog retailer '{slug}' has no extraction profile");
    }

    if config.proxy.is_complete() {
        println!("proxy: session proxy configured");
    } else if config.proxy.endpoint.is_some()
        || config.proxy.username.is_some()
        || config.proxy.password.is_some()
    {
        println!("warning: proxy settings are incomplete; fetching directly");
    } else {
        println!("proxy: none");
    }

    println!("config ok");
    Ok(())
}
