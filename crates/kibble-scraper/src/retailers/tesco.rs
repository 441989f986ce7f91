use crate::extract::profile::strings;
use crate::extract::{FieldSelectors, RetailerProfile};

/// Grocery pet aisle. Listing categories come from the
/// `/shop/<department>/<aisle>/<shelf>` path shape.
pub(super) fn profile() -> RetailerProfile {
    let mut profile = RetailerProfile::new("tesco", &["www.tesco.com"]);
    profile.listing_url = r"^/groceries/en-GB/shop/pets(?:/[a-z0-9-]+)*/?(?:\?.*)?$".to_owned();
    profile.product_url = r"^/groceries/en-GB/products/[0-9]+/?(?:\?.*)?$".to_owned();
    profile.external_id_url = Some(r"/products/([0-9]+)".to_owned());
    profile.breadcrumb_depth = 0;
    profile.selectors = super::with_common(FieldSelectors {
        title: strings(&["h1[data-auto='pdp-product-title']", "h1.product-details-tile__title"]),
        description: strings(&["[data-auto='pdp-marketing-text']", "#product-marketing"]),
        price: strings(&["[data-auto='pdp-price'] .value", ".price-per-sellable-unit .value"]),
        original_price: strings(&["[data-auto='pdp-was-price']"]),
        size: strings(&["[data-auto='pdp-net-contents']", "#net-contents"]),
        images: strings(&["[data-auto='pdp-product-image'] img", ".product-image img"]),
        ingredients: strings(&["#ingredients", "[data-auto='pdp-ingredients']"]),
        nutrition_rows: strings(&[".product-info-block--nutrition table tbody tr", "[data-auto='pdp-nutrition'] tr"]),
        stock: strings(&["[data-auto='pdp-unavailable-message']", ".product-info-message"]),
        breadcrumbs: strings(&["nav[aria-label='breadcrumb'] li", ".breadcrumbs li"]),
        product_links: strings(&["[data-auto='product-tile'] a[data-auto='product-tile--title']@href", ".product-list a.product-tile--title@href"]),
        next_page: strings(&["a[data-auto='pagination-next']@href", ".pagination--button.prev-next@href"]),
        page_links: strings(&["nav.pagination a@href", ".pagination-component a@href"]),
        review_container: strings(&["[data-auto='review']", ".review"]),
        review_id: strings(&["[data-review-id]@data-review-id"]),
        review_rating: strings(&["[data-auto='review-rating']@aria-label", ".review__rating"]),
        review_author: strings(&["[data-auto='review-author']", ".review__author"]),
        review_title: strings(&["[data-auto='review-title']", ".review__title"]),
        review_body: strings(&["[data-auto='review-text']", ".review__text"]),
        review_date: strings(&["[data-auto='review-date']", ".review__date"]),
        review_verified: strings(&["[data-auto='verified-buyer']"]),
        ..FieldSelectors::default()
    });
    profile
}
