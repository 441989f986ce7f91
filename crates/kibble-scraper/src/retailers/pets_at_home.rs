use crate::extract::profile::strings;
use crate::extract::{FieldSelectors, RetailerProfile};

pub(super) fn profile() -> RetailerProfile {
    let mut profile = RetailerProfile::new("pets-at-home", &["www.petsathome.com", "petsathome.com"]);
    profile.listing_url = r"^/product/listing/[a-z0-9/-]+/?(?:\?.*)?$".to_owned();
    profile.product_url = r"^/product/[a-z0-9-]+/[0-9]+[A-Z]?/?(?:\?.*)?$".to_owned();
    profile.external_id_url = Some(r"^/product/[^/]+/([0-9]+[A-Z]?)".to_owned());
    profile.category_segment = Some(r"^/product/listing/(?:[^/]+/)*([^/?]+)".to_owned());
    profile.breadcrumb_depth = 1;
    profile.selectors = super::with_common(FieldSelectors {
        title: strings(&["h1[data-testid='product-title']", "h1.product-title"]),
        description: strings(&["[data-testid='product-description']"]),
        brand: strings(&["[data-testid='product-brand']", "a.product-brand"]),
        price: strings(&["[data-testid='product-price'] .now", "[data-testid='product-price']"]),
        original_price: strings(&["[data-testid='product-price'] .was"]),
        size: strings(&["[data-testid='variant-selector'] [aria-checked='true']", ".variant-size.selected"]),
        images: strings(&["[data-testid='product-gallery'] img"]),
        ingredients: strings(&["[data-testid='composition']"]),
        nutrition_rows: strings(&["[data-testid='analytical-constituents'] tr"]),
        nutrition_text: strings(&["[data-testid='analytical-constituents']"]),
        stock: strings(&["[data-testid='stock-message']", "[data-testid='add-to-basket']"]),
        breadcrumbs: strings(&["nav[aria-label='Breadcrumb'] li"]),
        external_id: strings(&["[data-product-code]@data-product-code"]),
        product_links: strings(&["[data-testid='product-card'] a[href]@href"]),
        page_links: strings(&["[data-testid='pagination'] a@href"]),
        review_container: strings(&["[data-testid='review-card']"]),
        review_id: strings(&["[data-review-id]@data-review-id"]),
        review_rating: strings(&["[data-testid='review-stars']@aria-label"]),
        review_author: strings(&["[data-testid='review-author']"]),
        review_title: strings(&["[data-testid='review-title']"]),
        review_body: strings(&["[data-testid='review-text']"]),
        review_date: strings(&["[data-testid='review-date']"]),
        review_verified: strings(&["[data-testid='verified-purchase']"]),
        review_helpful: strings(&["[data-testid='review-helpful-count']"]),
        ..FieldSelectors::default()
    });
    profile
}
