//! Error handling and error types for gam-native.
//!
//! The safety kernel and the codec primitives report failure through
//! sentinels (`bool`, `Option`). The layers built on top of them translate
//! those sentinels into [`GamError`] so that callers get one `Result` type
//! with a stable category for logging.

use std::io;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum GamError {
    /// Arithmetic or allocation sizing would exceed the representable range
    #[error("Overflow: {operation}")]
    Overflow { operation: String },

    /// Allocation refused, either because sizing overflowed or memory ran out
    #[error("Out of memory: {requested_items} items of {bytes_per_item} bytes")]
    OutOfMemory {
        requested_items: usize,
        bytes_per_item: usize,
    },

    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Loss name not present in the registry
    #[error("Unknown loss: {name:?}")]
    UnknownLoss { name: String },

    /// Metric name not present in the registry
    #[error("Unknown metric: {name:?}")]
    UnknownMetric { name: String },

    /// Pack width not on the legal progression
    #[error("Illegal pack width: {items_per_pack} items per word is not on the progression")]
    IllegalPackWidth { items_per_pack: isize },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Target value unusable by the selected loss
    #[error("Invalid target at index {index}: {value}, {reason}")]
    InvalidTarget {
        index: usize,
        value: f64,
        reason: String,
    },

    /// Numerical computation errors
    #[error("Numerical error: {message}")]
    Numerical { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Memory-related errors
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Allocation failed: requested {count} items of {bytes_per_item} bytes")]
    AllocationFailed { count: usize, bytes_per_item: usize },
}

/// Type alias for Results using GamError
pub type Result<T> = std::result::Result<T, GamError>;

impl GamError {
    /// Create an overflow error
    pub fn overflow<S: Into<String>>(operation: S) -> Self {
        GamError::Overflow {
            operation: operation.into(),
        }
    }

    /// Create an out of memory error
    pub fn out_of_memory(requested_items: usize, bytes_per_item: usize) -> Self {
        GamError::OutOfMemory {
            requested_items,
            bytes_per_item,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        GamError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        GamError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown loss error
    pub fn unknown_loss<S: Into<String>>(name: S) -> Self {
        GamError::UnknownLoss { name: name.into() }
    }

    /// Create an unknown metric error
    pub fn unknown_metric<S: Into<String>>(name: S) -> Self {
        GamError::UnknownMetric { name: name.into() }
    }

    /// Create an illegal pack width error
    pub fn illegal_pack_width(items_per_pack: isize) -> Self {
        GamError::IllegalPackWidth { items_per_pack }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        GamError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target<R: Into<String>>(index: usize, value: f64, reason: R) -> Self {
        GamError::InvalidTarget {
            index,
            value,
            reason: reason.into(),
        }
    }

    /// Create a numerical error
    pub fn numerical<S: Into<String>>(message: S) -> Self {
        GamError::Numerical {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        GamError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Allocation failures are recoverable: the training loop may retry on
    /// the dynamic path or with fewer bins.
    pub fn is_recoverable(&self) -> bool {
        match self {
            GamError::Overflow { .. } => false,
            GamError::OutOfMemory { .. } => true,
            GamError::Config { .. } => false,
            GamError::InvalidParameter { .. } => false,
            GamError::UnknownLoss { .. } => false,
            GamError::UnknownMetric { .. } => false,
            GamError::IllegalPackWidth { .. } => true,
            GamError::DimensionMismatch { .. } => false,
            GamError::InvalidTarget { .. } => false,
            GamError::Numerical { .. } => true,
            GamError::IO { .. } => false,
            GamError::Json { .. } => false,
            GamError::Toml { .. } => false,
            GamError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            GamError::Overflow { .. } => "overflow",
            GamError::OutOfMemory { .. } => "out_of_memory",
            GamError::Config { .. } => "config",
            GamError::InvalidParameter { .. } => "invalid_parameter",
            GamError::UnknownLoss { .. } => "unknown_loss",
            GamError::UnknownMetric { .. } => "unknown_metric",
            GamError::IllegalPackWidth { .. } => "illegal_pack_width",
            GamError::DimensionMismatch { .. } => "dimension_mismatch",
            GamError::InvalidTarget { .. } => "invalid_target",
            GamError::Numerical { .. } => "numerical",
            GamError::IO { .. } => "io",
            GamError::Json { .. } => "json",
            GamError::Toml { .. } => "toml",
            GamError::Internal { .. } => "internal",
        }
    }
}

impl From<MemoryError> for GamError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::AllocationFailed {
                count,
                bytes_per_item,
            } => GamError::out_of_memory(count, bytes_per_item),
        }
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::GamError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::GamError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
