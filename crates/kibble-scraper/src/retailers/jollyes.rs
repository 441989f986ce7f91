use crate::extract::profile::strings;
use crate::extract::{FieldSelectors, RetailerProfile};

/// Category pages sit at least two segments deep (`/dog/dog-food.html`);
/// product pages are a single `.html` segment.
pub(super) fn profile() -> RetailerProfile {
    let mut profile = RetailerProfile::new("jollyes", &["www.jollyes.co.uk", "jollyes.co.uk"]);
    profile.listing_url = r"^/(?:[a-z0-9-]+/)+[a-z0-9-]+\.html(?:\?.*)?$".to_owned();
    profile.product_url = r"^/[a-z0-9-]+\.html(?:\?.*)?$".to_owned();
    profile.category_segment = Some(r"/([a-z0-9-]+)\.html$".to_owned());
    profile.breadcrumb_depth = 0;
    profile.selectors = super::with_common(FieldSelectors {
        title: strings(&["h1.page-title span", "h1.page-title"]),
        description: strings(&[".product.attribute.description .value"]),
        brand: strings(&[".product-brand a", "[data-th='Brand']"]),
        price: strings(&[".product-info-price [data-price-type='finalPrice']@data-price-amount", ".product-info-price .price"]),
        original_price: strings(&[".product-info-price [data-price-type='oldPrice']@data-price-amount", ".old-price .price"]),
        size: strings(&["[data-th='Size']", "[data-th='Weight']"]),
        images: strings(&[".gallery-placeholder img", ".product.media img"]),
        ingredients: strings(&["[data-th='Ingredients']", "#ingredients"]),
        nutrition_rows: strings(&["#nutrition table tr"]),
        nutrition_text: strings(&["[data-th='Analytical Constituents']"]),
        stock: strings(&[".product-info-stock-sku .stock", ".stock.available", ".stock.unavailable"]),
        breadcrumbs: strings(&[".breadcrumbs li"]),
        external_id: strings(&[".product-info-stock-sku .sku .value", "[data-product-sku]@data-product-sku"]),
        barcode: strings(&["[data-th='EAN']"]),
        product_links: strings(&[".products-grid a.product-item-link@href", ".product-items a.product-item-photo@href"]),
        next_page: strings(&[".pages-item-next a@href"]),
        page_links: strings(&[".pages-items a.page@href"]),
        review_container: strings(&[".review-items .review-item"]),
        review_rating: strings(&[".rating-result@title", ".rating-result span@style"]),
        review_author: strings(&[".review-author .review-details-value"]),
        review_title: strings(&[".review-title"]),
        review_body: strings(&[".review-content"]),
        review_date: strings(&[".review-date .review-details-value", "time@datetime"]),
        ..FieldSelectors::default()
    });
    profile
}
