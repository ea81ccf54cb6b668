//! Log-loss metrics for the classification losses.

use super::{check_metric_shapes, Metric, MetricKind, METRIC_LOG_LOSS, METRIC_MULTITASK_LOG_LOSS};
use crate::core::error::{GamError, Result};
use crate::core::types::{FloatScore, TaskClassifier};
use crate::objective::{BinaryLogLoss, Loss, LossFunction, LossKind, MulticlassLogLoss, MultitaskBinaryLogLoss};
use ndarray::{ArrayView2, Zip};

/// Mean per-sample loss of a log-loss variant, evaluated on raw scores.
#[derive(Debug, Clone)]
pub struct LogLossMetric {
    loss: LossFunction,
}

impl LogLossMetric {
    /// Binary or multiclass log loss, depending on the class count.
    pub fn for_task(task: TaskClassifier) -> Result<Self> {
        if task.is_regression() {
            return Err(GamError::config(format!(
                "metric {} applies to classification, not regression",
                METRIC_LOG_LOSS
            )));
        }
        let classes = task.class_count().ok_or_else(|| {
            GamError::config("the class count must be resolved before the metric is built")
        })?;
        let loss = if task.is_binary() {
            LossFunction::BinaryLogLoss(BinaryLogLoss::new())
        } else {
            LossFunction::MulticlassLogLoss(MulticlassLogLoss::new(classes)?)
        };
        Ok(LogLossMetric { loss })
    }

    pub fn multitask(num_tasks: usize) -> Result<Self> {
        Ok(LogLossMetric {
            loss: LossFunction::MultitaskBinaryLogLoss(MultitaskBinaryLogLoss::new(num_tasks)?),
        })
    }
}

impl Metric for LogLossMetric {
    fn name(&self) -> &'static str {
        match self.loss.kind() {
            LossKind::MultitaskBinaryLogLoss => METRIC_MULTITASK_LOG_LOSS,
            _ => METRIC_LOG_LOSS,
        }
    }

    fn kind(&self) -> MetricKind {
        match self.loss.kind() {
            LossKind::MulticlassLogLoss => MetricKind::MulticlassLogLoss,
            LossKind::MultitaskBinaryLogLoss => MetricKind::MultitaskLogLoss,
            _ => MetricKind::LogLoss,
        }
    }

    fn compute(&self, scores: ArrayView2<'_, FloatScore>, targets: ArrayView2<'_, FloatScore>) -> Result<FloatScore> {
        check_metric_shapes(
            self.loss.vector_length(),
            self.loss.targets_per_sample(),
            &scores,
            &targets,
        )?;
        self.loss.validate_targets(targets.view())?;
        let losses = Zip::from(scores.rows())
            .and(targets.rows())
            .par_map_collect(|score, target| self.loss.sample_loss(score, target));
        Ok(losses.sum() / scores.nrows() as FloatScore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_binary_log_loss_at_zero_score() {
        let metric = LogLossMetric::for_task(TaskClassifier::new(2)).unwrap();
        let scores = Array2::zeros((4, metric.loss.vector_length()));
        let targets = Array2::from_shape_fn((4, 1), |(i, _)| (i % 2) as f64);
        let value = metric.evaluate(scores.view(), targets.view()).unwrap();
        assert_abs_diff_eq!(value, 2f64.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_multiclass_confident_prediction() {
        let metric = LogLossMetric::for_task(TaskClassifier::new(3)).unwrap();
        assert_eq!(metric.kind(), MetricKind::MulticlassLogLoss);
        let scores = array![[40.0, 0.0, 0.0], [0.0, 0.0, 40.0]];
        let targets = array![[0.0], [2.0]];
        let value = metric.evaluate(scores.view(), targets.view()).unwrap();
        assert!(value >= 0.0);
        assert!(value < 1e-5);
    }

    #[test]
    fn test_wrong_label_is_floored() {
        let metric = LogLossMetric::for_task(TaskClassifier::new(3)).unwrap();
        let scores = array![[1000.0, 0.0, 0.0]];
        let targets = array![[1.0]];
        let value = metric.evaluate(scores.view(), targets.view()).unwrap();
        assert!(value.is_finite());
        assert!(value <= 16.2);
    }

    #[test]
    fn test_multitask_metric() {
        let metric = LogLossMetric::multitask(2).unwrap();
        assert_eq!(metric.name(), METRIC_MULTITASK_LOG_LOSS);
        let scores = Array2::zeros((3, 2));
        let targets = array![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0]];
        let value = metric.evaluate(scores.view(), targets.view()).unwrap();
        assert_abs_diff_eq!(value, 2f64.ln(), epsilon = 1e-5);
        assert!(LogLossMetric::multitask(0).is_err());
    }

    #[test]
    fn test_invalid_targets_rejected() {
        let metric = LogLossMetric::for_task(TaskClassifier::new(3)).unwrap();
        let scores = Array2::zeros((1, 3));
        let targets = array![[3.0]];
        assert!(metric.evaluate(scores.view(), targets.view()).is_err());
    }
}
