pub mod bet;
pub mod levels;
pub mod nuoi;
pub mod pairs;
pub mod stats;
pub mod tables;

pub use tables::{Class, Scheme};
