//! Core infrastructure for gam-native.
//!
//! This module provides the foundational components the codec and the loss
//! module are built on.
//!
//! # Organization
//!
//! - [`types`]: scalar aliases and the task classifier
//! - [`constants`]: epsilon tolerances, sentinels and specialization ceilings
//! - [`error`]: the [`GamError`] taxonomy
//! - [`safety`]: overflow predicates and range-checked conversions
//! - [`memory`]: aligned, overflow-checked allocation and the trailing-array arena
//! - [`dispatch`]: compile-time versus runtime parameter selection
//! - [`utils`]: registry string matching
//!
//! # Usage
//!
//! ```rust
//! use gam_native::core::{
//!     constants::ITEMS_PER_BIT_PACK_MAX,
//!     memory::safe_alloc,
//!     safety::multiply_overflows,
//! };
//!
//! assert!(multiply_overflows(usize::MAX, 2));
//! assert!(safe_alloc::<u64>(usize::MAX / 8 + 1).is_none());
//! assert_eq!(ITEMS_PER_BIT_PACK_MAX, usize::BITS as isize);
//! ```

pub mod constants;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod safety;
pub mod types;
pub mod utils;

pub use constants::*;
pub use error::{GamError, Result};
pub use memory::{AlignedBuffer, TrailingArray};
pub use types::*;

use crate::io::bit_pack::{self, Dynamic, PACK_WIDTH_PROGRESSION_LEN};
use crate::objective::{is_negligible_gradient, BinaryLogLoss, Loss, MulticlassLogLoss, SquaredErrorLoss};
use ndarray::{array, Array1};
use std::sync::atomic::{AtomicBool, Ordering};

/// Build-time choices compiled into this library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreCapabilities {
    /// Approximate exponential
    pub fast_exp: bool,
    /// Approximate logarithm
    pub fast_log: bool,
    /// Binary classification runs as two-class multiclass
    pub expand_binary_logits: bool,
    /// Bits in one storage word
    pub word_bits: usize,
    /// Number of specialized pack widths
    pub pack_widths: usize,
    /// Highest class count with its own specialization
    pub max_specialized_classes: isize,
}

impl Default for CoreCapabilities {
    fn default() -> Self {
        CoreCapabilities {
            fast_exp: cfg!(feature = "fast-exp"),
            fast_log: cfg!(feature = "fast-log"),
            expand_binary_logits: cfg!(feature = "expand-binary-logits"),
            word_bits: BITS_FOR_STORAGE_TYPE,
            pack_widths: PACK_WIDTH_PROGRESSION_LEN,
            max_specialized_classes: COMPILER_OPTIMIZED_TARGET_CLASSES_MAX,
        }
    }
}

impl CoreCapabilities {
    pub fn current() -> Self {
        Self::default()
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        let mut features = Vec::new();
        if self.fast_exp {
            features.push("fast exp");
        }
        if self.fast_log {
            features.push("fast log");
        }
        if self.expand_binary_logits {
            features.push("expanded binary logits");
        }
        if features.is_empty() {
            features.push("precise math");
        }
        format!(
            "Core capabilities: {}-bit words, {} pack widths, classes specialized up to {}, {}",
            self.word_bits,
            self.pack_widths,
            self.max_specialized_classes,
            features.join(", ")
        )
    }
}

/// Startup checks and logging setup.
#[derive(Debug, Default)]
pub struct CoreModule {
    capabilities: CoreCapabilities,
    verbosity: VerbosityLevel,
    initialized: bool,
}

impl CoreModule {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    /// Log at `verbosity` unless `RUST_LOG` says otherwise.
    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        CoreModule {
            capabilities: CoreCapabilities::current(),
            verbosity,
            initialized: false,
        }
    }

    /// Set up logging and run the self-check.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        initialize_logging(self.verbosity);
        self.self_check()?;
        self.initialized = true;
        log::info!("gam-native {} core initialized", GAM_NATIVE_VERSION);
        log::debug!("{}", self.capabilities.summary());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn capabilities(&self) -> &CoreCapabilities {
        &self.capabilities
    }

    /// Check the invariants the rest of the crate relies on.
    pub fn self_check(&self) -> Result<()> {
        self.check_progression()?;
        self.check_allocation()?;
        self.check_codec()?;
        self.check_binary_multiclass_agreement()?;
        self.check_gradient_floor()?;
        log::debug!("core self-check passed");
        Ok(())
    }

    fn check_progression(&self) -> Result<()> {
        let widths: Vec<isize> = bit_pack::pack_width_progression().collect();
        let well_formed = widths.len() == PACK_WIDTH_PROGRESSION_LEN
            && widths.first() == Some(&ITEMS_PER_BIT_PACK_MAX)
            && widths.last() == Some(&ITEMS_PER_BIT_PACK_MIN)
            && widths.windows(2).all(|pair| pair[1] < pair[0])
            && widths.iter().all(|&width| bit_pack::is_on_progression(width));
        if !well_formed {
            return Err(GamError::internal(format!("malformed pack width progression {:?}", widths)));
        }
        Ok(())
    }

    fn check_allocation(&self) -> Result<()> {
        let one = memory::safe_alloc::<f64>(1).ok_or_else(|| GamError::out_of_memory(1, 8))?;
        if !one.is_aligned() {
            return Err(GamError::internal("aligned allocation is misaligned"));
        }
        let too_many = usize::MAX / std::mem::size_of::<u64>() + 1;
        if memory::safe_alloc::<u64>(too_many).is_some() {
            return Err(GamError::internal("overflowing allocation was not refused"));
        }
        Ok(())
    }

    fn check_codec(&self) -> Result<()> {
        let values = [5usize, 0, 3, 7, 1, 6, 2];
        let width = Dynamic::new(BITS_FOR_STORAGE_TYPE / 3)
            .ok_or_else(|| GamError::internal("no dynamic width for 3-bit items"))?;
        let words = bit_pack::pack(&values, width)?;
        let decoded: Vec<usize> = bit_pack::UnpackIter::new(&words, width, values.len()).collect();
        if decoded != values {
            return Err(GamError::internal("bit pack round trip failed"));
        }
        Ok(())
    }

    fn check_binary_multiclass_agreement(&self) -> Result<()> {
        let binary = BinaryLogLoss::<crate::objective::DefaultMath>::new();
        let multiclass = MulticlassLogLoss::<crate::objective::DefaultMath>::new(2)?;
        let (mut binary_gradient, mut binary_hessian) = (Array1::zeros(1), Array1::zeros(1));
        let (mut gradient, mut hessian) = (Array1::zeros(2), Array1::zeros(2));
        binary.sample_gradients(
            array![0.7].view(),
            array![1.0].view(),
            binary_gradient.view_mut(),
            binary_hessian.view_mut(),
        );
        multiclass.sample_gradients(
            array![0.0, 0.7].view(),
            array![1.0].view(),
            gradient.view_mut(),
            hessian.view_mut(),
        );
        let drift = (binary_gradient[0] - gradient[1]).abs();
        if EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS < drift {
            return Err(GamError::numerical(format!(
                "binary and two-class gradients differ by {:e}",
                drift
            )));
        }
        Ok(())
    }

    /// A perfect prediction must land under the gradient floor.
    fn check_gradient_floor(&self) -> Result<()> {
        let loss = SquaredErrorLoss::new();
        let at_label = loss.gradient(0.1 + 0.2, 0.3);
        if !is_negligible_gradient(at_label) || is_negligible_gradient(loss.gradient(0.0, 1.0)) {
            return Err(GamError::numerical(format!(
                "gradient {:e} at the label is not below the floor {:e}",
                at_label, EPSILON_GRADIENT
            )));
        }
        Ok(())
    }
}

/// `env_logger` at `verbosity`, with `RUST_LOG` directives taking over when set.
fn logging_builder(verbosity: VerbosityLevel) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(verbosity.to_level_filter());
    builder.parse_env(env_logger::Env::default());
    builder
}

fn initialize_logging(verbosity: VerbosityLevel) {
    let _ = logging_builder(verbosity).try_init();
}

static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize logging and run the core self-check once per process.
pub fn initialize_core() -> Result<()> {
    initialize_core_with(VerbosityLevel::default())
}

/// [`initialize_core`] with an explicit default log level.
pub fn initialize_core_with(verbosity: VerbosityLevel) -> Result<()> {
    if CORE_INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }
    CoreModule::with_verbosity(verbosity).initialize()?;
    CORE_INITIALIZED.store(true, Ordering::Release);
    Ok(())
}

pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::Acquire)
}

pub fn core_capabilities() -> CoreCapabilities {
    CoreCapabilities::current()
}
