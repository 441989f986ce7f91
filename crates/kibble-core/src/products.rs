use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money;

/// Free-form, retailer-specific key/value annotations carried alongside a
/// normalized record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A product page URL discovered on a retailer listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingUrl {
    pub url: String,
    pub retailer_slug: String,
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A further page of a paginated listing, e.g. `?page=3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedListingUrl {
    pub url: String,
    pub retailer_slug: String,
    /// 1-based page number.
    pub page_number: u32,
    pub category: Option<String>,
    /// The listing page this link was found on.
    pub discovered_from: Option<String>,
}

/// A product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Current and pre-sale price of a product in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub price_pence: i64,
    pub original_price_pence: Option<i64>,
    /// ISO 4217 currency code, e.g. `"GBP"`.
    pub currency: String,
}

impl ProductPrice {
    /// `true` iff an original price exists and is strictly higher than the
    /// current price.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.original_price_pence
            .is_some_and(|original| original > self.price_pence)
    }

    /// Discount as a percentage rounded to two decimal places, or `None`
    /// when there is no discount.
    #[must_use]
    pub fn discount_percentage(&self) -> Option<f64> {
        money::discount_percentage(self.price_pence, self.original_price_pence)
    }
}

/// A product page reduced to normalized facts.
///
/// Fields that could not be located on the page are `None`; extraction never
/// guesses a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub title: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price_pence: i64,
    pub original_price_pence: Option<i64>,
    pub currency: String,
    /// Net weight in grams. Volumes are recorded 1 ml = 1 g with the source
    /// unit kept in `metadata["weight_unit"]`.
    pub weight_grams: Option<u32>,
    /// Units per pack for multipacks (`"12 x 400g"` → 12).
    pub quantity: Option<u32>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub ingredients: Option<String>,
    pub nutritional_info: Option<BTreeMap<String, String>>,
    pub in_stock: bool,
    pub stock_quantity: Option<u32>,
    pub external_id: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<Metadata>,
    /// GTIN / EAN barcode digits.
    pub barcode: Option<String>,
}

impl ProductDetail {
    /// Creates a detail record with only the required fields set; everything
    /// optional starts absent and stock defaults to in stock.
    #[must_use]
    pub fn new(title: impl Into<String>, price_pence: i64, currency: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            brand: None,
            price_pence,
            original_price_pence: None,
            currency: currency.into(),
            weight_grams: None,
            quantity: None,
            images: Vec::new(),
            ingredients: None,
            nutritional_info: None,
            in_stock: true,
            stock_quantity: None,
            external_id: None,
            category: None,
            metadata: None,
            barcode: None,
        }
    }

    #[must_use]
    pub fn price(&self) -> ProductPrice {
        ProductPrice {
            price_pence: self.price_pence,
            original_price_pence: self.original_price_pence,
            currency: self.currency.clone(),
        }
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.price().has_discount()
    }

    #[must_use]
    pub fn discount_percentage(&self) -> Option<f64> {
        self.price().discount_percentage()
    }

    /// Returns the image flagged as primary, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_primary)
    }
}

/// A customer review. `rating` is always on a 0–5 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReview {
    pub external_id: String,
    pub rating: f64,
    pub author: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub verified_purchase: bool,
    pub review_date: Option<NaiveDate>,
    pub helpful_count: u32,
    pub metadata: Option<Metadata>,
}

/// Maximum value of the normalized rating scale.
pub const RATING_SCALE_MAX: f64 = 5.0;

/// Maps `value` on a `0..=scale` scale onto `0..=5`, clamping out-of-range
/// input. Non-finite values and non-positive scales yield `None`.
#[must_use]
pub fn normalize_rating(value: f64, scale: f64) -> Option<f64> {
    if !value.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    let normalized = (value / scale * RATING_SCALE_MAX).clamp(0.0, RATING_SCALE_MAX);
    // Two decimal places is the finest any retailer displays.
    Some((normalized * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_detail() -> ProductDetail {
        let mut detail = ProductDetail::new("Adult Dry Dog Food Chicken 12kg", 4299, "GBP");
        detail.brand = Some("Harringtons".to_string());
        detail.original_price_pence = Some(4999);
        detail.weight_grams = Some(12_000);
        detail.images = vec![
            ProductImage {
                url: "https://cdn.example.com/a.jpg".to_string(),
                alt_text: Some("front of pack".to_string()),
                is_primary: true,
                width: Some(800),
                height: Some(800),
            },
            ProductImage {
                url: "https://cdn.example.com/b.jpg".to_string(),
                alt_text: None,
                is_primary: false,
                width: None,
                height: None,
            },
        ];
        detail.ingredients = Some("Chicken (26%), rice, maize".to_string());
        detail.nutritional_info = Some(BTreeMap::from([
            ("protein".to_string(), "26%".to_string()),
            ("fat".to_string(), "14%".to_string()),
        ]));
        detail.stock_quantity = Some(3);
        detail.external_id = Some("7136893P".to_string());
        detail.category = Some("dog food".to_string());
        detail.metadata = Some(Metadata::from([(
            "weight_unit".to_string(),
            serde_json::json!("kg"),
        )]));
        detail.barcode = Some("5060000000000".to_string());
        detail
    }

    #[test]
    fn has_discount_requires_strictly_higher_original() {
        let mut price = ProductPrice {
            price_pence: 1000,
            original_price_pence: None,
            currency: "GBP".to_string(),
        };
        assert!(!price.has_discount());

        price.original_price_pence = Some(1000);
        assert!(!price.has_discount());

        price.original_price_pence = Some(999);
        assert!(!price.has_discount());

        price.original_price_pence = Some(1001);
        assert!(price.has_discount());
    }

    #[test]
    fn has_discount_matches_definition_over_grid() {
        let originals = [None, Some(0), Some(1), Some(499), Some(500), Some(501), Some(10_000)];
        for current in [0_i64, 1, 500, 9_999] {
            for original in originals {
                let price = ProductPrice {
                    price_pence: current,
                    original_price_pence: original,
                    currency: "GBP".to_string(),
                };
                let expected = original.is_some_and(|o| o > current);
                assert_eq!(price.has_discount(), expected, "{current} vs {original:?}");

                let mut detail = ProductDetail::new("x", current, "GBP");
                detail.original_price_pence = original;
                assert_eq!(detail.has_discount(), expected);
                assert_eq!(
                    detail.discount_percentage().is_some(),
                    expected && original.is_some_and(|o| o > 0)
                );
            }
        }
    }

    #[test]
    fn discount_percentage_from_detail() {
        let mut detail = ProductDetail::new("Chews", 1299, "GBP");
        detail.original_price_pence = Some(1500);
        assert_eq!(detail.discount_percentage(), Some(13.4));
    }

    #[test]
    fn new_defaults_to_in_stock_with_optional_fields_absent() {
        let detail = ProductDetail::new("Cat Litter", 599, "GBP");
        assert!(detail.in_stock);
        assert!(detail.brand.is_none());
        assert!(detail.images.is_empty());
        assert!(detail.primary_image().is_none());
    }

    #[test]
    fn primary_image_is_flagged_image() {
        let detail = make_detail();
        assert_eq!(
            detail.primary_image().map(|i| i.url.as_str()),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn serde_roundtrip_product_detail() {
        let detail = make_detail();
        let json = serde_json::to_string(&detail).expect("serialization failed");
        let decoded: ProductDetail = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(decoded, detail);
    }

    #[test]
    fn serde_roundtrip_listing_types() {
        let listing = ListingUrl {
            url: "https://www.example.co.uk/p/123".to_string(),
            retailer_slug: "example".to_string(),
            category: Some("cat food".to_string()),
            metadata: Metadata::from([("position".to_string(), serde_json::json!(4))]),
        };
        let json = serde_json::to_string(&listing).unwrap();
        assert_eq!(serde_json::from_str::<ListingUrl>(&json).unwrap(), listing);

        let page = PaginatedListingUrl {
            url: "https://www.example.co.uk/c/cat?page=2".to_string(),
            retailer_slug: "example".to_string(),
            page_number: 2,
            category: None,
            discovered_from: Some("https://www.example.co.uk/c/cat".to_string()),
        };
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(
            serde_json::from_str::<PaginatedListingUrl>(&json).unwrap(),
            page
        );
    }

    #[test]
    fn serde_roundtrip_review() {
        let review = ProductReview {
            external_id: "r-1".to_string(),
            rating: 4.5,
            author: Some("Sam".to_string()),
            title: Some("Fussy eater approved".to_string()),
            body: "Our cat finally eats her dinner.".to_string(),
            verified_purchase: true,
            review_date: NaiveDate::from_ymd_opt(2024, 3, 14),
            helpful_count: 7,
            metadata: None,
        };
        let json = serde_json::to_string(&review).unwrap();
        assert_eq!(serde_json::from_str::<ProductReview>(&json).unwrap(), review);
    }

    #[test]
    fn normalize_rating_scales_and_clamps() {
        assert_eq!(normalize_rating(90.0, 100.0), Some(4.5));
        assert_eq!(normalize_rating(4.0, 5.0), Some(4.0));
        assert_eq!(normalize_rating(8.0, 10.0), Some(4.0));
        assert_eq!(normalize_rating(7.0, 5.0), Some(5.0));
        assert_eq!(normalize_rating(-1.0, 5.0), Some(0.0));
        assert_eq!(normalize_rating(3.0, 0.0), None);
        assert_eq!(normalize_rating(f64::NAN, 5.0), None);
    }
}
