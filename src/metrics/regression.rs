//! Regression metrics.

use super::{check_metric_shapes, Metric, MetricKind, METRIC_RMSE};
use crate::core::error::Result;
use crate::core::types::FloatScore;
use ndarray::{ArrayView2, Zip};

/// Root mean squared error of a single-score regression.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmseMetric;

impl RmseMetric {
    pub fn new() -> Self {
        RmseMetric
    }
}

impl Metric for RmseMetric {
    fn name(&self) -> &'static str {
        METRIC_RMSE
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Rmse
    }

    fn compute(&self, scores: ArrayView2<'_, FloatScore>, targets: ArrayView2<'_, FloatScore>) -> Result<FloatScore> {
        check_metric_shapes(1, 1, &scores, &targets)?;
        let sum_squares = Zip::from(scores.column(0))
            .and(targets.column(0))
            .fold(0.0, |acc, &score, &target| {
                let diff = score - target;
                acc + diff * diff
            });
        Ok((sum_squares / scores.nrows() as FloatScore).sqrt())
    }
}
