//! # meshport-core
//!
//! Core crate for Meshport. Contains the closed format enumerations, the
//! conversion error taxonomy, configuration schemas and logging setup.
//!
//! This crate has **no** internal dependencies on other Meshport crates.

pub mod config;
pub mod error;
pub mod format;
pub mod result;
pub mod telemetry;

pub use config::MeshportConfig;
pub use error::{ConfigError, ConvertError, FormatDirection};
pub use format::{InputFormat, OutputFormat};
pub use result::ConvertResult;
