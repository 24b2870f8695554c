#![forbid(unsafe_code)]

pub mod calculator;
pub mod catalog;
pub mod error;
pub mod model;
pub mod time;

pub use calculator::{Calculator, CalculatorSettings, CalculatorSettingsError};
pub use catalog::{Catalog, CatalogError, TopicSpec};
pub use error::ValidationError;
pub use time::Clock;
