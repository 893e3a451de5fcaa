//! OpenLine — shared wiring for the binaries.

pub mod config;
pub mod pipeline;

pub use config::{AppConfig, StoreConfig};
