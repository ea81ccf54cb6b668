//! Compile-time versus runtime parameter selection.
//!
//! Three axes can be fixed at build time to let the optimizer unroll loops:
//! the task classifier (class count), the number of tensor dimensions and the
//! bit-pack width. Each axis has a "dynamic" sentinel. Code written against a
//! hint type resolves to the hint's constant when it is not the sentinel and
//! to a caller-supplied runtime value otherwise. The runtime operand is a
//! closure, so it is never evaluated on the statically resolved path.
//!
//! The `dispatch_*` functions go the other way: they map a runtime value onto
//! the matching specialization, within the ceilings defined in
//! [`crate::core::constants`], and fall back to the dynamic instantiation
//! outside them.

use crate::core::constants::*;
use crate::core::types::TaskClassifier;
use crate::io::bit_pack::is_on_progression;
use static_assertions::const_assert_eq;

/// A parameter that is either a build-time constant or the dynamic sentinel.
pub trait Hint {
    /// Value type of the axis.
    type Value: Copy + PartialEq;
    /// The compile-time value carried by this hint.
    const VALUE: Self::Value;
    /// The axis' "resolve at runtime" sentinel.
    const DYNAMIC: Self::Value;

    #[inline(always)]
    fn is_dynamic() -> bool {
        Self::VALUE == Self::DYNAMIC
    }
}

/// Class-count hint. `Classes<0>` is dynamic, `Classes<-1>` is regression.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classes<const N: isize>;

/// Tensor dimensionality hint. `Dims<0>` is dynamic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dims<const N: usize>;

/// Bit-pack width hint. `ItemsPerPack<0>` is dynamic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemsPerPack<const N: isize>;

impl<const N: isize> Hint for Classes<N> {
    type Value = isize;
    const VALUE: isize = N;
    const DYNAMIC: isize = DYNAMIC_CLASSIFICATION;
}

impl<const N: usize> Hint for Dims<N> {
    type Value = usize;
    const VALUE: usize = N;
    const DYNAMIC: usize = DYNAMIC_DIMENSIONS;
}

impl<const N: isize> Hint for ItemsPerPack<N> {
    type Value = isize;
    const VALUE: isize = N;
    const DYNAMIC: isize = ITEMS_PER_BIT_PACK_DYNAMIC;
}

/// Resolve a hint against a lazily evaluated runtime value.
#[inline(always)]
pub fn resolve<H: Hint>(runtime: impl FnOnce() -> H::Value) -> H::Value {
    if H::is_dynamic() {
        runtime()
    } else {
        H::VALUE
    }
}

/// Effective task classifier for a class-count hint.
#[inline(always)]
pub fn get_learning_type_or_count_classes<const N: isize>(
    runtime: impl FnOnce() -> TaskClassifier,
) -> TaskClassifier {
    TaskClassifier::new(resolve::<Classes<N>>(|| runtime().raw()))
}

/// Effective dimension count for a dimensionality hint.
#[inline(always)]
pub fn get_dimensions<const N: usize>(runtime: impl FnOnce() -> usize) -> usize {
    resolve::<Dims<N>>(runtime)
}

/// Effective pack width for a pack-width hint.
#[inline(always)]
pub fn get_items_per_bit_pack<const N: isize>(runtime: impl FnOnce() -> isize) -> isize {
    resolve::<ItemsPerPack<N>>(runtime)
}

/// Receives the class-count specialization chosen by [`dispatch_classes`].
pub trait ClassesVisitor {
    type Output;
    fn visit<const N: isize>(self) -> Self::Output;
}

/// Receives the dimensionality specialization chosen by [`dispatch_dimensions`].
pub trait DimensionsVisitor {
    type Output;
    fn visit<const N: usize>(self) -> Self::Output;
}

/// Receives the pack-width specialization chosen by [`dispatch_items_per_pack`].
pub trait ItemsPerPackVisitor {
    type Output;
    fn visit<const N: isize>(self) -> Self::Output;
}

// The match arms below enumerate the specialized range by hand.
const_assert_eq!(COMPILER_OPTIMIZED_TARGET_CLASSES_START, 3);
const_assert_eq!(COMPILER_OPTIMIZED_TARGET_CLASSES_MAX, 8);
const_assert_eq!(COMPILER_OPTIMIZED_COUNT_DIMENSIONS_MAX, 2);

/// True when `classes` has its own specialization.
pub const fn is_specialized_classes(classes: TaskClassifier) -> bool {
    let raw = classes.raw();
    classes.is_regression()
        || classes.is_binary()
        || (COMPILER_OPTIMIZED_TARGET_CLASSES_START <= raw && raw <= COMPILER_OPTIMIZED_TARGET_CLASSES_MAX)
}

/// Route a runtime task classifier to its specialization.
///
/// Regression, binary and multiclass counts up to the ceiling get their own
/// instantiation. Everything else runs `visit::<0>()`, which must read the
/// class count at runtime.
pub fn dispatch_classes<V: ClassesVisitor>(classes: TaskClassifier, visitor: V) -> V::Output {
    if !is_specialized_classes(classes) {
        return visitor.visit::<{ DYNAMIC_CLASSIFICATION }>();
    }
    match classes.raw() {
        REGRESSION => visitor.visit::<{ REGRESSION }>(),
        2 => visitor.visit::<2>(),
        3 => visitor.visit::<3>(),
        4 => visitor.visit::<4>(),
        5 => visitor.visit::<5>(),
        6 => visitor.visit::<6>(),
        7 => visitor.visit::<7>(),
        8 => visitor.visit::<8>(),
        _ => visitor.visit::<{ DYNAMIC_CLASSIFICATION }>(),
    }
}

/// Route a runtime dimension count to its specialization.
pub fn dispatch_dimensions<V: DimensionsVisitor>(dimensions: usize, visitor: V) -> V::Output {
    match dimensions {
        1 => visitor.visit::<1>(),
        2 => visitor.visit::<2>(),
        _ => visitor.visit::<{ DYNAMIC_DIMENSIONS }>(),
    }
}

/// Route a runtime pack width to its specialization.
///
/// Every width on the progression has an instantiation, as does the
/// single-bin "no packing" width. Off-progression widths run the dynamic
/// instantiation.
pub fn dispatch_items_per_pack<V: ItemsPerPackVisitor>(items_per_pack: isize, visitor: V) -> V::Output {
    if ITEMS_PER_BIT_PACK_NONE == items_per_pack {
        return visitor.visit::<{ ITEMS_PER_BIT_PACK_NONE }>();
    }
    if !is_on_progression(items_per_pack) {
        log::debug!(
            "no specialization for {} items per pack, using the dynamic path",
            items_per_pack
        );
        return visitor.visit::<{ ITEMS_PER_BIT_PACK_DYNAMIC }>();
    }
    // 64, 21, 12, 9 and 7 are only on the progression of 64-bit words
    match items_per_pack {
        #[cfg(target_pointer_width = "64")]
        64 => visitor.visit::<64>(),
        32 => visitor.visit::<32>(),
        #[cfg(target_pointer_width = "64")]
        21 => visitor.visit::<21>(),
        16 => visitor.visit::<16>(),
        #[cfg(target_pointer_width = "64")]
        12 => visitor.visit::<12>(),
        10 => visitor.visit::<10>(),
        #[cfg(target_pointer_width = "64")]
        9 => visitor.visit::<9>(),
        8 => visitor.visit::<8>(),
        #[cfg(target_pointer_width = "64")]
        7 => visitor.visit::<7>(),
        6 => visitor.visit::<6>(),
        5 => visitor.visit::<5>(),
        4 => visitor.visit::<4>(),
        3 => visitor.visit::<3>(),
        2 => visitor.visit::<2>(),
        1 => visitor.visit::<1>(),
        _ => visitor.visit::<{ ITEMS_PER_BIT_PACK_DYNAMIC }>(),
    }
}
