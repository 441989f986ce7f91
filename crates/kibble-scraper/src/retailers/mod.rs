//! Built-in retailer profiles.
//!
//! Each profile lists retailer-specific selectors first; the common
//! microdata / Open Graph fallbacks are appended by [`with_common`].

mod jollyes;
mod pets_at_home;
mod pets_corner;
mod tesco;
mod zooplus;

use crate::extract::{FieldSelectors, RetailerProfile};

/// Known page shapes for every built-in retailer: one or more listing pages
/// followed by product pages. The registry is validated against these.
pub const SAMPLE_URLS: &[&str] = &[
    "https://www.petsathome.com/product/listing/dog/dog-food/dry-dog-food",
    "https://www.petsathome.com/product/listing/cat?page=2",
    "https://www.petsathome.com/product/wainwrights-adult-dry-dog-food-turkey-and-rice/7136891P",
    "https://www.zooplus.co.uk/shop/dogs/dry_dog_food",
    "https://www.zooplus.co.uk/shop/dogs/dry_dog_food/royal_canin_size?p=3",
    "https://www.zooplus.co.uk/shop/dogs/dry_dog_food/royal_canin_size/royal_canin_adult/128489",
    "https://www.jollyes.co.uk/dog/dog-food.html",
    "https://www.jollyes.co.uk/cat/cat-litter.html?p=2",
    "https://www.jollyes.co.uk/burns-original-chicken-and-brown-rice-12kg.html",
    "https://www.petscorner.co.uk/dog/dog-food/",
    "https://www.petscorner.co.uk/cat/cat-treats/?page=4",
    "https://www.petscorner.co.uk/product/lilys-kitchen-chicken-casserole-400g/",
    "https://www.tesco.com/groceries/en-GB/shop/pets/dog-food-and-treats/dry-dog-food/all",
    "https://www.tesco.com/groceries/en-GB/shop/pets/cat-food-and-accessories/all?page=2",
    "https://www.tesco.com/groceries/en-GB/products/254656543",
];

/// All built-in profiles.
#[must_use]
pub fn builtin_profiles() -> Vec<RetailerProfile> {
    vec![
        pets_at_home::profile(),
        zooplus::profile(),
        jollyes::profile(),
        pets_corner::profile(),
        tesco::profile(),
    ]
}

fn with_common(specific: FieldSelectors) -> FieldSelectors {
    FieldSelectors::ahead_of(specific, FieldSelectors::common())
}
