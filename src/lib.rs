//! # gam-native
//!
//! The numeric substrate beneath a gradient-boosted additive model trainer:
//!
//! - **Bit-pack codec** ([`io`]): many small per-sample bin indices stored in
//!   one machine word, at a pack width picked from a fixed progression.
//! - **Safety kernel** ([`core::safety`], [`core::memory`]): overflow
//!   predicates that every size computation routes through, and allocation
//!   that refuses instead of wrapping.
//! - **Dispatch selector** ([`core::dispatch`]): one implementation body
//!   instantiated both with build-time constants and with runtime values.
//! - **Losses** ([`objective`]): gradients and Hessians for regression,
//!   binary, multiclass and multitask-binary targets, selected by name once
//!   and then called from the parallel per-sample loop.
//!
//! The tree learner, dataset loading and model export live elsewhere and
//! consume the packed buffers and gradient arrays this crate produces.
//!
//! ## Quick Start
//!
//! ```rust
//! use gam_native::{ConfigBuilder, Loss, PackedBin};
//! use ndarray::{array, Array2};
//!
//! # fn main() -> gam_native::Result<()> {
//! gam_native::init()?;
//!
//! // 4 bins fit in 2 bits, so 32 items share one 64-bit word
//! let feature = PackedBin::from_bins(&[3, 0, 2, 1, 3], 4)?;
//! assert_eq!(feature.get(2), Some(2));
//!
//! let config = ConfigBuilder::new().loss("logloss").num_classes(2).build()?;
//! let loss = config.create_loss()?;
//! // one logit per sample, two with `expand-binary-logits`
//! let width = loss.vector_length();
//! let scores = Array2::from_elem((2, width), 0.5);
//! let targets = array![[1.0], [0.0]];
//! let mut gradients = Array2::zeros((2, width));
//! let mut hessians = Array2::zeros((2, width));
//! loss.compute_gradients(scores.view(), targets.view(), gradients.view_mut(), hessians.view_mut())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Build-time features
//!
//! - `fast-exp`, `fast-log` (default): approximate exp/log in the log-loss
//!   family, with a looser binary-versus-multiclass tolerance.
//! - `expand-binary-logits`: binary classification emits two logits and runs
//!   through the multiclass path.

#![doc(html_root_url = "https://docs.rs/gam-native/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Bit-packed feature storage
pub mod io;

// Losses and their derivatives
pub mod objective;

// Validation metrics
pub mod metrics;

pub use crate::core::{
    error::{GamError, MemoryError, Result},
    types::{BinIndex, FloatScore, StorageWord, TaskClassifier, TaskKind, VerbosityLevel},
};

pub use config::{ConfigBuilder, CoreConfig};

pub use io::{PackedBin, PackedBinHeader};

pub use objective::{create_loss, Loss, LossFunction, LossKind};

pub use metrics::{create_metric, Metric, MetricFunction, MetricKind};

pub use crate::core::constants::GAM_NATIVE_VERSION as VERSION;

/// Initialize the library.
///
/// Sets up `env_logger` (honoring `RUST_LOG`, `info` by default) and runs the
/// core self-check. Calling it again is a no-op.
///
/// # Examples
///
/// ```rust
/// fn main() -> gam_native::Result<()> {
///     gam_native::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    crate::core::initialize_core()
}

/// [`init`] logging at `config.verbosity` when `RUST_LOG` is unset.
pub fn init_with_config(config: &CoreConfig) -> Result<()> {
    crate::core::initialize_core_with(config.verbosity)
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    crate::core::is_core_initialized()
}

/// Build-time choices compiled into this library.
///
/// ```rust
/// let caps = gam_native::capabilities();
/// println!("{}", caps.summary());
/// ```
pub fn capabilities() -> crate::core::CoreCapabilities {
    crate::core::core_capabilities()
}
