pub mod align;
pub mod error;
pub mod load;
pub mod models;

pub use error::FeedError;
