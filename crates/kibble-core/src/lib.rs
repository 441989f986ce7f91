pub mod app_config;
pub mod catalog;
pub mod config;
pub mod money;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ProxySettings, RotationMode};
pub use catalog::{
    load_catalog, slugify, BrandConfig, CategoryKeyword, RetailerCatalog, RetailerConfig,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use money::{discount_percentage, format_money, format_pence, parse_price_pence};
pub use products::{
    normalize_rating, ListingUrl, Metadata, PaginatedListingUrl, ProductDetail, ProductImage,
    ProductPrice, ProductReview,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}
