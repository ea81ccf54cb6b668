//! Configuration for the numeric core.
//!
//! [`CoreConfig`] names the loss and metric by their registry strings, fixes
//! the task classifier and bin budget, and sizes the worker pool. It loads
//! from TOML or JSON files and from `GAM_NATIVE_*` environment variables.
//! Build-time choices (approximate math, binary logit expansion) are cargo
//! features and do not appear here.

pub mod core;

pub use self::core::{ConfigBuilder, CoreConfig};

use crate::core::error::{GamError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "gam-native.toml";

/// Default loss registry name.
pub const DEFAULT_LOSS: &str = "mse";
/// Default number of bins per feature.
pub const DEFAULT_MAX_BINS: usize = 256;
/// Default number of targets per sample.
pub const DEFAULT_NUM_TASKS: usize = 1;
/// Zero lets rayon pick.
pub const DEFAULT_NUM_THREADS: usize = 0;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "GAM_NATIVE_";

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl Default for ConfigFormat {
    fn default() -> Self {
        ConfigFormat::Toml
    }
}

impl ConfigFormat {
    /// Format implied by the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(GamError::config(format!(
                "unsupported config file {}, use .toml or .json",
                path.display()
            ))),
        }
    }
}
