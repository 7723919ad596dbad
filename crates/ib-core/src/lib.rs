//! ib-core: shared error type and configuration for the imageboost service.
//!
//! This crate is the foundational dependency for all other ib-* crates,
//! providing the unified error type, `Result` alias, and the converter
//! configuration (worker pool sizing and reference-rewrite rules).

pub mod config;
pub mod error;

// Re-export the most commonly used items at the crate root.
pub use config::{Config, ConversionRule, ConverterConfig};
pub use error::{Error, Result};
