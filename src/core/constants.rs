//! System constants for gam-native.
//!
//! Epsilon tolerances, task classifier sentinels, bit-pack limits and the
//! ceilings that bound compile-time specialization. Everything here is fixed
//! at build time.

use crate::core::safety::count_bits_required;
use crate::core::types::*;
use static_assertions::const_assert;

/// Memory alignment size for SIMD operations.
pub const ALIGNED_SIZE: usize = 32;

/// Gain should never be negative. This value is far below any small negative
/// number produced by numeric noise so the two cannot be confused.
pub const ILLEGAL_GAIN: FloatScore = FloatScore::MIN;

/// Largest negative gain tolerated before a gain is treated as illegal.
pub const EPSILON_NEGATIVE_GAIN_ALLOWED: FloatScore = -1e-7;

/// Largest negative validation metric tolerated before it is reported.
pub const EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED: FloatScore = -1e-7;

/// Gradient magnitudes below this are numerically negligible.
pub const EPSILON_GRADIENT: FloatScore = 1e-7;

/// Tolerance when comparing a binary computation against the equivalent
/// two-column multiclass computation. The approximate exp/log routines add
/// noise, so the tolerance widens when either is compiled in.
#[cfg(any(feature = "fast-exp", feature = "fast-log"))]
pub const EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS: FloatScore = 1e-1;

/// Tolerance when comparing a binary computation against the equivalent
/// two-column multiclass computation.
#[cfg(not(any(feature = "fast-exp", feature = "fast-log")))]
pub const EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS: FloatScore = 1e-7;

/// Floor applied to predicted probabilities before taking a logarithm.
pub const EPSILON_LOG_LOSS: FloatScore = 1e-7;

/// Task classifier sentinel for regression.
pub const REGRESSION: isize = -1;

/// Task classifier sentinel for a class count known only at runtime.
pub const DYNAMIC_CLASSIFICATION: isize = 0;

/// Vector length of single-score tasks.
pub const ONE_SCORE: usize = 1;

/// Highest class count that gets a dedicated specialization. Raising it
/// increases compile time and binary size.
pub const COMPILER_OPTIMIZED_TARGET_CLASSES_MAX: isize = 8;

/// Lowest multiclass count that gets a dedicated specialization.
pub const COMPILER_OPTIMIZED_TARGET_CLASSES_START: isize = 3;

/// Bits needed to represent `usize::MAX`.
pub const BITS_FOR_SIZE_T: usize = count_bits_required(usize::MAX);

/// Hard maximum on tensor dimensions. With at least two bins per feature,
/// `2^N` cells would exhaust the address space beyond this, and the highest
/// bit stays free for bit manipulation inside loops.
pub const MAX_DIMENSIONS: usize = BITS_FOR_SIZE_T - 1;

/// Highest dimensionality that gets a dedicated specialization.
pub const COMPILER_OPTIMIZED_COUNT_DIMENSIONS_MAX: usize = 2;

/// Dimensionality sentinel meaning "resolve at runtime".
pub const DYNAMIC_DIMENSIONS: usize = 0;

/// Bits in one [`StorageWord`].
pub const BITS_FOR_STORAGE_TYPE: usize = count_bits_required(StorageWord::MAX);

/// Pack width used when a feature has a single bin. The item occupies a
/// whole record instead of sharing a word.
pub const ITEMS_PER_BIT_PACK_NONE: isize = -1;

/// Pack width sentinel meaning "resolve shift and mask amounts at runtime".
pub const ITEMS_PER_BIT_PACK_DYNAMIC: isize = 0;

/// Densest specialized pack width (one bit per item).
pub const ITEMS_PER_BIT_PACK_MAX: isize = BITS_FOR_STORAGE_TYPE as isize;

/// Sparsest specialized pack width (one item per word).
pub const ITEMS_PER_BIT_PACK_MIN: isize = 1;

/// Library version.
pub const GAM_NATIVE_VERSION: &str = env!("CARGO_PKG_VERSION");

const_assert!(ALIGNED_SIZE.is_power_of_two());
const_assert!(2 <= COMPILER_OPTIMIZED_TARGET_CLASSES_MAX);
const_assert!(COMPILER_OPTIMIZED_TARGET_CLASSES_START <= COMPILER_OPTIMIZED_TARGET_CLASSES_MAX);
const_assert!(1 <= COMPILER_OPTIMIZED_COUNT_DIMENSIONS_MAX);
const_assert!(COMPILER_OPTIMIZED_COUNT_DIMENSIONS_MAX <= MAX_DIMENSIONS);
const_assert!(MAX_DIMENSIONS < BITS_FOR_SIZE_T);
const_assert!(ITEMS_PER_BIT_PACK_MIN <= ITEMS_PER_BIT_PACK_MAX);
const_assert!(ITEMS_PER_BIT_PACK_MAX <= BITS_FOR_STORAGE_TYPE as isize);
// min and max must sit on the progression
const_assert!(
    ITEMS_PER_BIT_PACK_MIN
        == BITS_FOR_STORAGE_TYPE as isize / (BITS_FOR_STORAGE_TYPE as isize / ITEMS_PER_BIT_PACK_MIN)
);
const_assert!(
    ITEMS_PER_BIT_PACK_MAX
        == BITS_FOR_STORAGE_TYPE as isize / (BITS_FOR_STORAGE_TYPE as isize / ITEMS_PER_BIT_PACK_MAX)
);
const_assert!(EPSILON_NEGATIVE_GAIN_ALLOWED < 0.0);
const_assert!(EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED < 0.0);
const_assert!(EPSILON_GRADIENT <= EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS);
