//! Validation metrics.
//!
//! Metrics score a batch of raw model outputs against targets, in the same
//! `n x vector_length` / `n x targets_per_sample` layout the losses use.
//! Like losses they are picked by a case-insensitive registry name once at
//! setup.
//!
//! Every metric here is a non-negative quantity. Approximate exp/log can
//! push a mathematically zero value slightly below zero, so results in
//! `[EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED, 0)` are clamped to zero
//! with a warning and anything lower is reported as a numerical error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gam_native::metrics::{create_metric, Metric};
//! use gam_native::TaskClassifier;
//! use ndarray::array;
//!
//! # fn example() -> gam_native::Result<()> {
//! let metric = create_metric("rmse", TaskClassifier::REGRESSION, 1)?;
//! let scores = array![[1.0], [2.0], [3.0]];
//! let targets = array![[1.0], [2.0], [5.0]];
//! println!("RMSE: {:.6}", metric.evaluate(scores.view(), targets.view())?);
//! # Ok(())
//! # }
//! ```

pub mod classification;
pub mod regression;

pub use classification::LogLossMetric;
pub use regression::RmseMetric;

use crate::core::constants::EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED;
use crate::core::error::{GamError, Result};
use crate::core::types::{FloatScore, TaskClassifier};
use crate::core::utils::common::Common;
use crate::objective::LossKind;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry name of root mean squared error.
pub const METRIC_RMSE: &str = "rmse";
/// Registry name of binary or multiclass log loss.
pub const METRIC_LOG_LOSS: &str = "logloss";
/// Registry name of the mean per-label binary log loss.
pub const METRIC_MULTITASK_LOG_LOSS: &str = "multitask_logloss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Rmse,
    LogLoss,
    MulticlassLogLoss,
    MultitaskLogLoss,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Rmse => write!(f, "rmse"),
            MetricKind::LogLoss => write!(f, "log_loss"),
            MetricKind::MulticlassLogLoss => write!(f, "multiclass_log_loss"),
            MetricKind::MultitaskLogLoss => write!(f, "multitask_log_loss"),
        }
    }
}

/// A validation metric.
pub trait Metric: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn kind(&self) -> MetricKind;

    /// Whether larger values mean a better model.
    fn is_higher_better(&self) -> bool {
        false
    }

    /// Metric value before the negative guard.
    fn compute(&self, scores: ArrayView2<'_, FloatScore>, targets: ArrayView2<'_, FloatScore>) -> Result<FloatScore>;

    /// Metric value with small negative noise clamped to zero.
    fn evaluate(&self, scores: ArrayView2<'_, FloatScore>, targets: ArrayView2<'_, FloatScore>) -> Result<FloatScore> {
        guard_negative_metric(self.name(), self.compute(scores, targets)?)
    }
}

/// Clamp tolerated negative noise to zero, reject anything worse.
pub fn guard_negative_metric(name: &str, value: FloatScore) -> Result<FloatScore> {
    if value.is_nan() {
        return Err(GamError::numerical(format!("metric {} evaluated to NaN", name)));
    }
    if 0.0 <= value {
        return Ok(value);
    }
    if EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED <= value {
        log::warn!("metric {} was slightly negative ({:e}), reporting 0", name, value);
        return Ok(0.0);
    }
    Err(GamError::numerical(format!(
        "metric {} evaluated to {}, below the tolerated {}",
        name, value, EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED
    )))
}

pub(crate) fn check_metric_shapes(
    vector_length: usize,
    targets_per_sample: usize,
    scores: &ArrayView2<'_, FloatScore>,
    targets: &ArrayView2<'_, FloatScore>,
) -> Result<()> {
    if 0 == scores.nrows() {
        return Err(GamError::numerical("metrics are undefined on an empty batch"));
    }
    if scores.ncols() != vector_length {
        return Err(GamError::dimension_mismatch(
            format!("{} scores per sample", vector_length),
            format!("{}", scores.ncols()),
        ));
    }
    if targets.dim() != (scores.nrows(), targets_per_sample) {
        return Err(GamError::dimension_mismatch(
            format!("targets of shape {:?}", (scores.nrows(), targets_per_sample)),
            format!("{:?}", targets.dim()),
        ));
    }
    Ok(())
}

/// Metric variant chosen at setup.
#[derive(Debug, Clone)]
pub enum MetricFunction {
    Rmse(RmseMetric),
    LogLoss(LogLossMetric),
}

impl Metric for MetricFunction {
    fn name(&self) -> &'static str {
        match self {
            MetricFunction::Rmse(metric) => metric.name(),
            MetricFunction::LogLoss(metric) => metric.name(),
        }
    }

    fn kind(&self) -> MetricKind {
        match self {
            MetricFunction::Rmse(metric) => metric.kind(),
            MetricFunction::LogLoss(metric) => metric.kind(),
        }
    }

    fn compute(&self, scores: ArrayView2<'_, FloatScore>, targets: ArrayView2<'_, FloatScore>) -> Result<FloatScore> {
        match self {
            MetricFunction::Rmse(metric) => metric.compute(scores, targets),
            MetricFunction::LogLoss(metric) => metric.compute(scores, targets),
        }
    }
}

/// Names accepted by [`create_metric`].
pub fn registered_metric_names() -> Vec<&'static str> {
    vec![METRIC_RMSE, METRIC_LOG_LOSS, METRIC_MULTITASK_LOG_LOSS]
}

/// Metric reported when the configuration names none.
pub fn default_metric_name(loss: LossKind) -> &'static str {
    match loss {
        LossKind::SquaredError => METRIC_RMSE,
        LossKind::BinaryLogLoss | LossKind::MulticlassLogLoss => METRIC_LOG_LOSS,
        LossKind::MultitaskBinaryLogLoss => METRIC_MULTITASK_LOG_LOSS,
    }
}

/// Build the metric registered under `name` for `task`.
pub fn create_metric(name: &str, task: TaskClassifier, num_tasks: usize) -> Result<MetricFunction> {
    let metric = if Common::is_name_match(name, METRIC_RMSE) {
        if !task.is_regression() {
            return Err(GamError::config(format!(
                "metric {} applies to regression, not {}",
                METRIC_RMSE, task
            )));
        }
        MetricFunction::Rmse(RmseMetric::new())
    } else if Common::is_name_match(name, METRIC_LOG_LOSS) {
        MetricFunction::LogLoss(LogLossMetric::for_task(task)?)
    } else if Common::is_name_match(name, METRIC_MULTITASK_LOG_LOSS) {
        if task.is_regression() {
            return Err(GamError::config(format!(
                "metric {} applies to classification, not regression",
                METRIC_MULTITASK_LOG_LOSS
            )));
        }
        MetricFunction::LogLoss(LogLossMetric::multitask(num_tasks)?)
    } else {
        return Err(GamError::unknown_metric(name));
    };
    log::debug!("metric {:?} resolved to {}", name.trim(), metric.kind());
    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_negative_guard() {
        assert_eq!(guard_negative_metric("m", 0.25).unwrap(), 0.25);
        assert_eq!(guard_negative_metric("m", 0.0).unwrap(), 0.0);
        assert_eq!(guard_negative_metric("m", -1e-9).unwrap(), 0.0);
        assert_eq!(
            guard_negative_metric("m", EPSILON_NEGATIVE_VALIDATION_METRIC_ALLOWED).unwrap(),
            0.0
        );
        let err = guard_negative_metric("m", -1e-3).unwrap_err();
        assert_eq!(err.category(), "numerical");
        assert!(guard_negative_metric("m", f64::NAN).is_err());
    }

    #[test]
    fn test_registry() {
        let rmse = create_metric(" RMSE", TaskClassifier::REGRESSION, 1).unwrap();
        assert_eq!(rmse.kind(), MetricKind::Rmse);
        assert!(!rmse.is_higher_better());

        let multiclass = create_metric("LogLoss", TaskClassifier::new(4), 1).unwrap();
        assert_eq!(multiclass.kind(), MetricKind::MulticlassLogLoss);

        let multitask = create_metric("multitask_logloss", TaskClassifier::new(2), 3).unwrap();
        assert_eq!(multitask.kind(), MetricKind::MultitaskLogLoss);

        assert!(matches!(
            create_metric("auc", TaskClassifier::new(2), 1).unwrap_err(),
            GamError::UnknownMetric { .. }
        ));
        assert!(create_metric("rmse", TaskClassifier::new(2), 1).is_err());
        assert!(create_metric("logloss", TaskClassifier::REGRESSION, 1).is_err());
    }

    #[test]
    fn test_default_metric_names() {
        assert_eq!(default_metric_name(LossKind::SquaredError), METRIC_RMSE);
        assert_eq!(default_metric_name(LossKind::MulticlassLogLoss), METRIC_LOG_LOSS);
        for kind in [
            LossKind::SquaredError,
            LossKind::BinaryLogLoss,
            LossKind::MulticlassLogLoss,
            LossKind::MultitaskBinaryLogLoss,
        ] {
            assert!(registered_metric_names().contains(&default_metric_name(kind)));
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        let metric = create_metric("rmse", TaskClassifier::REGRESSION, 1).unwrap();
        let empty = ndarray::Array2::<f64>::zeros((0, 1));
        assert!(metric.evaluate(empty.view(), empty.view()).is_err());

        let scores = array![[1.0, 2.0]];
        let targets = array![[1.0]];
        assert_eq!(
            metric.evaluate(scores.view(), targets.view()).unwrap_err().category(),
            "dimension_mismatch"
        );
    }
}
