//! Squared error loss.

use super::{Loss, LossKind, LOSS_MSE};
use crate::core::constants::ONE_SCORE;
use crate::core::types::FloatScore;
use ndarray::{ArrayView1, ArrayViewMut1};

/// `L = (prediction - label)^2 / 2`.
///
/// The half factor gives gradient `prediction - label` and unit Hessian.
/// Targets can be any finite value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SquaredErrorLoss;

impl SquaredErrorLoss {
    pub fn new() -> Self {
        SquaredErrorLoss
    }
}

impl Loss for SquaredErrorLoss {
    fn name(&self) -> &'static str {
        LOSS_MSE
    }

    fn kind(&self) -> LossKind {
        LossKind::SquaredError
    }

    fn vector_length(&self) -> usize {
        ONE_SCORE
    }

    #[inline]
    fn gradient(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        prediction - label
    }

    #[inline]
    fn hessian(&self, _prediction: FloatScore, _label: FloatScore) -> FloatScore {
        1.0
    }

    #[inline]
    fn loss(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        let diff = prediction - label;
        0.5 * diff * diff
    }

    #[inline]
    fn sample_gradients(
        &self,
        scores: ArrayView1<'_, FloatScore>,
        targets: ArrayView1<'_, FloatScore>,
        mut gradients: ArrayViewMut1<'_, FloatScore>,
        mut hessians: ArrayViewMut1<'_, FloatScore>,
    ) {
        gradients[0] = self.gradient(scores[0], targets[0]);
        hessians[0] = self.hessian(scores[0], targets[0]);
    }

    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore {
        self.loss(scores[0], targets[0])
    }

    /// Identity.
    fn transform(&self, _scores: ArrayViewMut1<'_, FloatScore>) {}

    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str> {
        if value.is_finite() {
            Ok(())
        } else {
            Err("regression targets must be finite")
        }
    }
}
