pub mod client;
pub mod error;
pub(crate) mod normalize;
pub mod types;

pub use client::{
    BusinessSearch, ReviewPage, SearchPage, YelpClient, MAX_LIMIT, MAX_RADIUS_METERS,
    MAX_RESULT_WINDOW,
};
pub use error::{ErrorKind, YelpError};
