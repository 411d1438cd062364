pub mod calendar;
pub mod config;
pub mod error;
pub mod reminder;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
