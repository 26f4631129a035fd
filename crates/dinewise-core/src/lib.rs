pub mod app_config;
pub mod config;
pub mod price;
pub mod region;
pub mod restaurant;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use price::{parse_price_list, PriceTier};
pub use region::{Region, UNBOUND_LOCATION_CODE};
pub use restaurant::{
    business_page_url, BusinessHours, Coordinates, ExternalReview, OpenPeriod, Provenance,
    RestaurantDetail, RestaurantSummary, ReviewAuthor,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown region code: {0}")]
    UnknownRegion(String),
}
