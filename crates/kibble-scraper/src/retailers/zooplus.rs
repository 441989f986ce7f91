use crate::extract::profile::strings;
use crate::extract::{FieldSelectors, RetailerProfile};

/// Listing paths have up to three lettered segments under the animal
/// (`/shop/dogs/dry_dog_food/royal_canin_size`); product paths end in the
/// numeric article id.
pub(super) fn profile() -> RetailerProfile {
    let mut profile = RetailerProfile::new("zooplus", &["www.zooplus.co.uk", "zooplus.co.uk"]);
    profile.listing_url = r"^/shop/[a-z_]+(?:/[a-z_][a-z0-9_]*){0,3}/?(?:\?.*)?$".to_owned();
    profile.product_url = r"^/shop/(?:[a-z0-9_]+/){2,4}[0-9]+/?(?:\?.*)?$".to_owned();
    profile.external_id_url = Some(r"/([0-9]+)/?$".to_owned());
    profile.category_segment = Some(r"^/shop/[a-z_]+/([a-z_]+)".to_owned());
    profile.selectors = super::with_common(FieldSelectors {
        title: strings(&["h1.producttitle", "[data-zta='productTitle']"]),
        description: strings(&["#description .content", "[data-zta='productDescription']"]),
        brand: strings(&["[data-zta='brandLink']", ".product__brand"]),
        price: strings(&["[data-zta='productPriceAmount']", ".z-price__amount"]),
        original_price: strings(&["[data-zta='productStrikeThroughPrice']", ".z-price__note--strike"]),
        size: strings(&["[data-zta='variantName']", ".product__variant-title"]),
        images: strings(&[".product-gallery img", "[data-zta='productImage']"]),
        ingredients: strings(&["#ingredients .content", "[data-zta='ingredients']"]),
        nutrition_rows: strings(&["#analytical-constituents tr"]),
        nutrition_text: strings(&["#analytical-constituents .content", "[data-zta='analyticalConstituents']"]),
        stock: strings(&["[data-zta='availability']", ".z-availability"]),
        breadcrumbs: strings(&[".breadcrumb__item", "[data-zta='breadcrumb'] li"]),
        barcode: strings(&["[data-zta='ean']"]),
        product_links: strings(&["[data-zta='product-link']@href", ".product-list a.product__link@href"]),
        next_page: strings(&["[data-zta='paginationNext']@href"]),
        page_links: strings(&["[data-zta='pagination'] a@href", ".pagination a@href"]),
        review_container: strings(&["[data-zta='review']", ".review-item"]),
        review_id: strings(&["[data-review-id]@data-review-id"]),
        review_rating: strings(&["[data-zta='reviewRating']@data-rating", ".review-rating"]),
        review_author: strings(&["[data-zta='reviewAuthor']", ".review-author"]),
        review_title: strings(&["[data-zta='reviewTitle']", ".review-title"]),
        review_body: strings(&["[data-zta='reviewText']", ".review-text"]),
        review_date: strings(&["[data-zta='reviewDate']", ".review-date"]),
        review_verified: strings(&["[data-zta='verifiedPurchase']"]),
        review_helpful: strings(&["[data-zta='reviewHelpful']"]),
        ..FieldSelectors::default()
    });
    profile
}
