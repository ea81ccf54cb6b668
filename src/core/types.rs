//! Core data types for gam-native.
//!
//! This module defines the fundamental scalar aliases shared by the codec,
//! the safety kernel and the loss module, together with the task classifier
//! that tells every other layer whether it is working on a regression,
//! binary, multiclass or multitask target.

use crate::core::constants::{DYNAMIC_CLASSIFICATION, REGRESSION};
use crate::core::safety::convert;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of bit-packed storage. One machine word.
pub type StorageWord = usize;

/// Floating point type for scores, gradients, hessians and losses.
pub type FloatScore = f64;

/// Discretized feature value.
pub type BinIndex = usize;

/// Learning type or count of target classes.
///
/// Negative values are the regression sentinel, zero means the class count
/// is only known at runtime, and any positive value is the literal number of
/// target classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskClassifier(isize);

impl TaskClassifier {
    /// Regression sentinel.
    pub const REGRESSION: TaskClassifier = TaskClassifier(REGRESSION);
    /// Class count resolved at runtime.
    pub const DYNAMIC_CLASSIFICATION: TaskClassifier = TaskClassifier(DYNAMIC_CLASSIFICATION);

    /// Wrap a raw classifier value.
    pub const fn new(raw: isize) -> Self {
        TaskClassifier(raw)
    }

    /// Classifier for a fixed number of target classes, `None` when the count
    /// does not fit the signed encoding.
    pub fn classes(count: usize) -> Option<Self> {
        convert::<isize, usize>(count).map(TaskClassifier)
    }

    /// Raw encoded value.
    pub const fn raw(self) -> isize {
        self.0
    }

    pub const fn is_regression(self) -> bool {
        REGRESSION == self.0
    }

    pub const fn is_classification(self) -> bool {
        0 <= self.0
    }

    /// True when the class count has not been resolved yet.
    pub const fn is_dynamic(self) -> bool {
        DYNAMIC_CLASSIFICATION == self.0
    }

    /// Exactly two classes, unless binary logits are expanded into the
    /// multiclass representation at build time.
    pub const fn is_binary(self) -> bool {
        if cfg!(feature = "expand-binary-logits") {
            false
        } else {
            2 == self.0
        }
    }

    pub const fn is_multiclass(self) -> bool {
        self.is_classification() && !self.is_binary()
    }

    /// Number of classes, if the classifier encodes a concrete class count.
    pub const fn class_count(self) -> Option<usize> {
        if 0 < self.0 {
            Some(self.0 as usize)
        } else {
            None
        }
    }

    /// Number of per-sample output slots (logits) a model produces.
    ///
    /// Meaningless for [`TaskClassifier::DYNAMIC_CLASSIFICATION`]; resolve the
    /// runtime class count first.
    pub const fn vector_length(self) -> usize {
        let single_output_ceiling = if cfg!(feature = "expand-binary-logits") { 1 } else { 2 };
        if self.0 <= single_output_ceiling {
            1
        } else {
            self.0 as usize
        }
    }

    /// Concrete task kind, `None` while the class count is dynamic.
    pub const fn kind(self) -> Option<TaskKind> {
        if self.is_regression() {
            Some(TaskKind::Regression)
        } else if self.is_dynamic() || self.0 < 0 {
            None
        } else if self.is_binary() {
            Some(TaskKind::BinaryClassification)
        } else {
            Some(TaskKind::MulticlassClassification)
        }
    }
}

impl Default for TaskClassifier {
    fn default() -> Self {
        TaskClassifier::REGRESSION
    }
}

impl fmt::Display for TaskClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_regression() {
            write!(f, "regression")
        } else if self.is_dynamic() {
            write!(f, "classification(dynamic)")
        } else {
            write!(f, "classification({})", self.0)
        }
    }
}

/// Kind of learning task a loss applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Continuous target
    Regression,
    /// Two classes, single logit
    BinaryClassification,
    /// One logit per class
    MulticlassClassification,
    /// Independent binary labels, one logit per label
    MultitaskBinary,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Regression => write!(f, "regression"),
            TaskKind::BinaryClassification => write!(f, "binary"),
            TaskKind::MulticlassClassification => write!(f, "multiclass"),
            TaskKind::MultitaskBinary => write!(f, "multitask_binary"),
        }
    }
}

/// Verbosity levels for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warning,
    /// General information
    Info,
    /// Detailed debugging information
    Debug,
}

impl Default for VerbosityLevel {
    fn default() -> Self {
        VerbosityLevel::Info
    }
}

impl VerbosityLevel {
    /// Matching `log` crate filter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Error => log::LevelFilter::Error,
            VerbosityLevel::Warning => log::LevelFilter::Warn,
            VerbosityLevel::Info => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}
