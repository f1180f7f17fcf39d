//! Batch conversion configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Defaults for batch conversions.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chunk size used when a batch call does not specify one.
    #[validate(range(min = 1, max = 64))]
    pub default_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 4,
        }
    }
}
