//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod provider;
pub mod series;

// Re-export main types for cleaner imports
pub use config::{AppConfig, Averaging};
pub use provider::{DataProvider, FetchError, FetchResult};
pub use series::{DataFunction, MonthKey, Symbol};
