//! Exponential and logarithm strategies for the log-loss family.
//!
//! [`PreciseMath`] defers to the standard library. [`FastMath`] uses range
//! reduction plus short polynomials and bit manipulation, with no libm call.
//! Its documented error bound is [`ExpLog::MAX_RELATIVE_ERROR`]; the
//! binary/multiclass equivalence tolerance
//! ([`EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS`]) is far wider than that,
//! and the tests verify the end-to-end gradient error empirically.
//!
//! [`EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS`]: crate::core::constants::EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS

use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use std::f64::consts::{LN_2, SQRT_2};
use std::fmt::Debug;
use std::marker::PhantomData;

/// Pluggable exp/log pair.
pub trait ExpLog: Debug + Default + Copy + Send + Sync + 'static {
    /// Name for logging.
    const NAME: &'static str;
    /// Bound on the relative error of [`ExpLog::exp`] and on the absolute
    /// error of [`ExpLog::log`] over their finite domains.
    const MAX_RELATIVE_ERROR: f64;

    fn exp(x: f64) -> f64;
    fn log(x: f64) -> f64;

    /// Logistic function.
    #[inline]
    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + Self::exp(-x))
    }

    /// Softmax of `scores` written to `out`, shifted by the maximum score.
    #[inline]
    fn softmax_into(scores: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let max_score = scores.fold(f64::NEG_INFINITY, |max, &score| max.max(score));
        let mut sum = 0.0;
        Zip::from(&mut out).and(&scores).for_each(|slot, &score| {
            *slot = Self::exp(score - max_score);
            sum += *slot;
        });
        out.mapv_inplace(|p| p / sum);
    }
}

/// Standard library exp/log.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreciseMath;

impl ExpLog for PreciseMath {
    const NAME: &'static str = "precise";
    const MAX_RELATIVE_ERROR: f64 = 1e-15;

    #[inline(always)]
    fn exp(x: f64) -> f64 {
        x.exp()
    }

    #[inline(always)]
    fn log(x: f64) -> f64 {
        x.ln()
    }
}

/// Approximate exp/log.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastMath;

const EXP_OVERFLOW: f64 = 709.782_712_893_384;
const EXP_FLUSH_TO_ZERO: f64 = -708.0;
const MANTISSA_MASK: u64 = 0x000f_ffff_ffff_ffff;
const EXPONENT_ONE: u64 = 0x3ff0_0000_0000_0000;

impl ExpLog for FastMath {
    const NAME: &'static str = "fast";
    const MAX_RELATIVE_ERROR: f64 = 1e-6;

    /// `exp(x) = 2^n * exp(r)` with `|r| <= ln(2) / 2` and a degree-6
    /// polynomial for `exp(r)`. Results below `exp(-708)` flush to zero.
    #[inline]
    fn exp(x: f64) -> f64 {
        if x.is_nan() {
            return x;
        }
        if EXP_OVERFLOW < x {
            return f64::INFINITY;
        }
        if x < EXP_FLUSH_TO_ZERO {
            return 0.0;
        }
        let n = (x / LN_2).round();
        let r = x - n * LN_2;
        let poly = 1.0
            + r * (1.0
                + r * (1.0 / 2.0
                    + r * (1.0 / 6.0 + r * (1.0 / 24.0 + r * (1.0 / 120.0 + r * (1.0 / 720.0))))));
        // n is within [-1021, 1024]; split 2^1024 so the exponent field never overflows
        let n = n as i64;
        if 1023 < n {
            poly * 2.0 * f64::from_bits(((n - 1 + 1023) as u64) << 52)
        } else {
            poly * f64::from_bits(((n + 1023) as u64) << 52)
        }
    }

    /// `log(m * 2^e) = e * ln(2) + log(m)` with `m` in `[sqrt(1/2), sqrt(2))`
    /// and the `atanh` series for `log(m)`.
    #[inline]
    fn log(x: f64) -> f64 {
        if x.is_nan() || x < 0.0 {
            return f64::NAN;
        }
        if 0.0 == x {
            return f64::NEG_INFINITY;
        }
        if x.is_infinite() {
            return x;
        }
        let (x, bias) = if x < f64::MIN_POSITIVE {
            (x * (1u64 << 52) as f64, -52)
        } else {
            (x, 0)
        };
        let bits = x.to_bits();
        let mut exponent = ((bits >> 52) & 0x7ff) as i64 - 1023 + bias;
        let mut mantissa = f64::from_bits((bits & MANTISSA_MASK) | EXPONENT_ONE);
        if SQRT_2 < mantissa {
            mantissa *= 0.5;
            exponent += 1;
        }
        let s = (mantissa - 1.0) / (mantissa + 1.0);
        let s2 = s * s;
        let log_mantissa =
            2.0 * s * (1.0 + s2 * (1.0 / 3.0 + s2 * (1.0 / 5.0 + s2 * (1.0 / 7.0 + s2 / 9.0))));
        exponent as f64 * LN_2 + log_mantissa
    }
}

/// `exp` from `E` and `log` from `L`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MixedMath<E, L>(PhantomData<(E, L)>);

impl<E: ExpLog, L: ExpLog> ExpLog for MixedMath<E, L> {
    const NAME: &'static str = "mixed";
    const MAX_RELATIVE_ERROR: f64 = if E::MAX_RELATIVE_ERROR < L::MAX_RELATIVE_ERROR {
        L::MAX_RELATIVE_ERROR
    } else {
        E::MAX_RELATIVE_ERROR
    };

    #[inline(always)]
    fn exp(x: f64) -> f64 {
        E::exp(x)
    }

    #[inline(always)]
    fn log(x: f64) -> f64 {
        L::log(x)
    }
}

/// Strategy chosen by the `fast-exp` / `fast-log` features.
#[cfg(all(feature = "fast-exp", feature = "fast-log"))]
pub type DefaultMath = FastMath;

/// Strategy chosen by the `fast-exp` / `fast-log` features.
#[cfg(all(feature = "fast-exp", not(feature = "fast-log")))]
pub type DefaultMath = MixedMath<FastMath, PreciseMath>;

/// Strategy chosen by the `fast-exp` / `fast-log` features.
#[cfg(all(not(feature = "fast-exp"), feature = "fast-log"))]
pub type DefaultMath = MixedMath<PreciseMath, FastMath>;

/// Strategy chosen by the `fast-exp` / `fast-log` features.
#[cfg(not(any(feature = "fast-exp", feature = "fast-log")))]
pub type DefaultMath = PreciseMath;
