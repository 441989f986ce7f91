use crate::extract::profile::strings;
use crate::extract::{FieldSelectors, RetailerProfile};

pub(super) fn profile() -> RetailerProfile {
    let mut profile = RetailerProfile::new("pets-corner", &["www.petscorner.co.uk", "petscorner.co.uk"]);
    profile.listing_url =
        r"^/(?:dog|cat|small-animal|bird|fish|reptile|puppy|kitten)/(?:[a-z0-9-]+/)*(?:\?.*)?$".to_owned();
    profile.product_url = r"^/product/[a-z0-9-]+/?(?:\?.*)?$".to_owned();
    profile.category_segment = Some(r"^/[a-z-]+/([a-z0-9-]+)/".to_owned());
    profile.breadcrumb_depth = 1;
    profile.selectors = super::with_common(FieldSelectors {
        title: strings(&["h1.product-name", ".product-details h1"]),
        description: strings(&[".product-description"]),
        brand: strings(&[".product-brand", ".brand-name a"]),
        price: strings(&[".product-price .current-price", ".product-price"]),
        original_price: strings(&[".product-price .rrp", ".product-price .was-price"]),
        size: strings(&[".variant-option.active", "select.variant-select option[selected]"]),
        images: strings(&[".product-images img", ".product-image-main img"]),
        ingredients: strings(&["#tab-composition", ".composition"]),
        nutrition_rows: strings(&["#tab-analytical table tr", ".analytical-constituents li"]),
        nutrition_text: strings(&["#tab-analytical", ".analytical-constituents"]),
        stock: strings(&[".stock-status", ".availability"]),
        breadcrumbs: strings(&["ol.breadcrumb li", ".breadcrumbs a"]),
        external_id: strings(&["[data-product-id]@data-product-id", ".product-code span"]),
        barcode: strings(&[".product-barcode", "[data-ean]@data-ean"]),
        product_links: strings(&[".product-grid .product-tile a.product-link@href", ".product-list a.product-tile@href"]),
        next_page: strings(&[".pagination .next a@href"]),
        page_links: strings(&[".pagination a@href"]),
        review_container: strings(&[".reviews .review"]),
        review_rating: strings(&[".review-rating@data-score", ".review-rating"]),
        review_author: strings(&[".review-author"]),
        review_title: strings(&[".review-heading"]),
        review_body: strings(&[".review-body"]),
        review_date: strings(&[".review-date"]),
        review_verified: strings(&[".review-verified"]),
        review_helpful: strings(&[".review-helpful"]),
        ..FieldSelectors::default()
    });
    profile
}
