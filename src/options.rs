//! Loader configuration.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};

/// Default number of rows materialized per physical read.
pub const DEFAULT_BLOCK_SIZE: u64 = 1_000_000;

/// Options controlling how a Parquet file is read.
///
/// ```
/// use parquet_loader::LoaderOptions;
///
/// let opts = LoaderOptions::default().with_block_size(50_000);
/// assert_eq!(opts.block_size, 50_000);
/// assert!(opts.treat_large_integers_as_timestamps);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Rows per physical read window. A block may span several row groups.
    pub block_size: u64,
    /// Read INT96 leaves as timestamps (Impala convention) instead of
    /// 128-bit row identifiers.
    pub treat_large_integers_as_timestamps: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            treat_large_integers_as_timestamps: true,
        }
    }
}

impl LoaderOptions {
    #[must_use]
    pub const fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub const fn with_large_integers_as_timestamps(mut self, enabled: bool) -> Self {
        self.treat_large_integers_as_timestamps = enabled;
        self
    }

    /// Parse options from a JSON object. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns [`LoaderError::Config`] if the JSON is malformed or the resulting
    /// options fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| LoaderError::Config(format!("parse loader options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// # Errors
    /// Returns [`LoaderError::Config`] when `block_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(LoaderError::Config("block_size must be positive".into()));
        }
        Ok(())
    }
}
