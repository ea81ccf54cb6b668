//! Overflow-checked arithmetic and lossless-conversion checks.
//!
//! Every size computation in the crate routes through these predicates. They
//! answer before the risky operation runs and never panic, allocate or
//! return errors, so they are safe to call from the innermost loops.

use crate::core::error::{GamError, Result};
use num_traits::PrimInt;

/// True iff `a * b` exceeds `usize::MAX`.
///
/// `usize::MAX < a * b` holds exactly when `usize::MAX / a < b` (floor
/// division). A zero `a` never overflows and is checked first so the
/// division is always defined.
#[inline(always)]
pub const fn multiply_overflows(a: usize, b: usize) -> bool {
    0 != a && usize::MAX / a < b
}

/// True iff `a + b` wraps around.
#[inline(always)]
pub const fn add_overflows(a: usize, b: usize) -> bool {
    a.wrapping_add(b) < a
}

/// Number of bits needed to hold `max_value`.
pub const fn count_bits_required(max_value: usize) -> usize {
    let mut remaining = max_value;
    let mut bits = 0;
    while 0 != remaining {
        remaining /= 2;
        bits += 1;
    }
    bits
}

/// Number of bits needed to hold the positive maximum of `T`.
pub fn count_bits_required_positive_max<T: PrimInt>() -> usize {
    std::mem::size_of::<T>() * 8 - T::max_value().leading_zeros() as usize
}

/// `a * b`, or an overflow error naming `operation`.
pub fn checked_product(a: usize, b: usize, operation: &str) -> Result<usize> {
    if multiply_overflows(a, b) {
        Err(GamError::overflow(format!("{}: {} * {}", operation, a, b)))
    } else {
        Ok(a * b)
    }
}

/// `a + b`, or an overflow error naming `operation`.
pub fn checked_sum(a: usize, b: usize, operation: &str) -> Result<usize> {
    if add_overflows(a, b) {
        Err(GamError::overflow(format!("{}: {} + {}", operation, a, b)))
    } else {
        Ok(a + b)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Primitive integers the conversion check understands.
///
/// Every implementor's range fits inside `i128`, which lets the check widen
/// both sides losslessly before comparing.
pub trait Integral: PrimInt + sealed::Sealed {
    /// Whether the type is signed.
    const SIGNED: bool;
    /// Lowest representable value, widened.
    const LOWEST: i128;
    /// Highest representable value, widened.
    const HIGHEST: i128;

    /// Lossless widening.
    fn widen(self) -> i128;
}

macro_rules! impl_integral {
    ($($t:ty => $signed:expr),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Integral for $t {
                const SIGNED: bool = $signed;
                const LOWEST: i128 = <$t>::MIN as i128;
                const HIGHEST: i128 = <$t>::MAX as i128;

                #[inline(always)]
                fn widen(self) -> i128 {
                    self as i128
                }
            }
        )*
    };
}

impl_integral! {
    i8 => true, i16 => true, i32 => true, i64 => true, isize => true,
    u8 => false, u16 => false, u32 => false, u64 => false, usize => false,
}

/// True iff `value` can be represented exactly in `Dst`.
///
/// Both types are checked to be integral at compile time through the
/// [`Integral`] bound. The comparison happens on widened values, so no
/// mixed-sign comparison or wrapping conversion ever happens.
#[inline(always)]
pub fn is_convertible<Dst: Integral, Src: Integral>(value: Src) -> bool {
    let number = value.widen();
    match (Dst::SIGNED, Src::SIGNED) {
        // signed from signed
        (true, true) => Dst::LOWEST <= number && number <= Dst::HIGHEST,
        // signed from unsigned
        (true, false) => number <= Dst::HIGHEST,
        // unsigned from signed
        (false, true) => 0 <= number && number <= Dst::HIGHEST,
        // unsigned from unsigned
        (false, false) => number <= Dst::HIGHEST,
    }
}

/// Lossless conversion, `None` when `value` does not fit in `Dst`.
#[inline]
pub fn convert<Dst: Integral, Src: Integral>(value: Src) -> Option<Dst> {
    if is_convertible::<Dst, Src>(value) {
        <Dst as num_traits::NumCast>::from(value)
    } else {
        None
    }
}
