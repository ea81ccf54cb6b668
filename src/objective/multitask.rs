//! Independent binary log loss per label column.

use super::classification::{binary_log_loss, check_binary_label};
use super::math::{DefaultMath, ExpLog};
use super::{Loss, LossKind, LOSS_MULTITASK_LOG_LOSS};
use crate::core::error::{GamError, Result};
use crate::core::types::FloatScore;
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use std::marker::PhantomData;

/// One binary log loss per task, with no interaction between tasks.
///
/// Each sample has `num_tasks` logits and `num_tasks` labels in `{0, 1}`.
/// The gradient and Hessian of task `t` depend only on logit `t` and label
/// `t`.
#[derive(Debug, Clone, Copy)]
pub struct MultitaskBinaryLogLoss<M: ExpLog = DefaultMath> {
    num_tasks: usize,
    _math: PhantomData<M>,
}

impl<M: ExpLog> MultitaskBinaryLogLoss<M> {
    pub fn new(num_tasks: usize) -> Result<Self> {
        if 0 == num_tasks {
            return Err(GamError::invalid_parameter(
                "num_tasks",
                num_tasks.to_string(),
                "multitask log loss needs at least one task",
            ));
        }
        Ok(MultitaskBinaryLogLoss {
            num_tasks,
            _math: PhantomData,
        })
    }

    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }
}

impl<M: ExpLog> Loss for MultitaskBinaryLogLoss<M> {
    fn name(&self) -> &'static str {
        LOSS_MULTITASK_LOG_LOSS
    }

    fn kind(&self) -> LossKind {
        LossKind::MultitaskBinaryLogLoss
    }

    fn vector_length(&self) -> usize {
        self.num_tasks
    }

    fn targets_per_sample(&self) -> usize {
        self.num_tasks
    }

    #[inline]
    fn gradient(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        prediction - label
    }

    #[inline]
    fn hessian(&self, prediction: FloatScore, _label: FloatScore) -> FloatScore {
        prediction * (1.0 - prediction)
    }

    #[inline]
    fn loss(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        binary_log_loss::<M>(prediction, label)
    }

    #[inline]
    fn sample_gradients(
        &self,
        scores: ArrayView1<'_, FloatScore>,
        targets: ArrayView1<'_, FloatScore>,
        gradients: ArrayViewMut1<'_, FloatScore>,
        hessians: ArrayViewMut1<'_, FloatScore>,
    ) {
        Zip::from(&scores)
            .and(&targets)
            .and(gradients)
            .and(hessians)
            .for_each(|&score, &label, gradient, hessian| {
                let p = M::sigmoid(score);
                *gradient = p - label;
                *hessian = p * (1.0 - p);
            });
    }

    /// Mean of the per-task losses.
    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore {
        let total: FloatScore = scores
            .iter()
            .zip(targets.iter())
            .map(|(&score, &label)| binary_log_loss::<M>(M::sigmoid(score), label))
            .sum();
        total / self.num_tasks as FloatScore
    }

    fn transform(&self, mut scores: ArrayViewMut1<'_, FloatScore>) {
        scores.mapv_inplace(M::sigmoid);
    }

    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str> {
        check_binary_label(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::classification::BinaryLogLoss;
    use crate::objective::math::PreciseMath;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_tasks_are_independent() {
        let multitask = MultitaskBinaryLogLoss::<PreciseMath>::new(3).unwrap();
        let binary = BinaryLogLoss::<PreciseMath>::new();

        let scores = array![[0.0, -1.5, 2.0], [3.0, 0.25, -0.75]];
        let targets = array![[1.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let mut gradients = Array2::zeros((2, 3));
        let mut hessians = Array2::zeros((2, 3));
        multitask
            .compute_gradients(scores.view(), targets.view(), gradients.view_mut(), hessians.view_mut())
            .unwrap();

        for ((i, t), &score) in scores.indexed_iter() {
            let mut gradient = array![0.0];
            let mut hessian = array![0.0];
            binary.sample_gradients(
                array![score].view(),
                array![targets[[i, t]]].view(),
                gradient.view_mut(),
                hessian.view_mut(),
            );
            assert_abs_diff_eq!(gradients[[i, t]], gradient[0], epsilon = 1e-15);
            assert_abs_diff_eq!(hessians[[i, t]], hessian[0], epsilon = 1e-15);
        }
        assert_abs_diff_eq!(gradients[[0, 0]], -0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_changing_one_label_leaves_others() {
        let loss = MultitaskBinaryLogLoss::<PreciseMath>::new(2).unwrap();
        let scores = array![0.4, -0.2];
        let mut first = (array![0.0, 0.0], array![0.0, 0.0]);
        let mut second = (array![0.0, 0.0], array![0.0, 0.0]);
        loss.sample_gradients(scores.view(), array![0.0, 1.0].view(), first.0.view_mut(), first.1.view_mut());
        loss.sample_gradients(scores.view(), array![1.0, 1.0].view(), second.0.view_mut(), second.1.view_mut());
        assert_eq!(first.0[1], second.0[1]);
        assert_ne!(first.0[0], second.0[0]);
    }

    #[test]
    fn test_shape_and_label_checks() {
        assert!(MultitaskBinaryLogLoss::<PreciseMath>::new(0).is_err());
        let loss = MultitaskBinaryLogLoss::<PreciseMath>::new(2).unwrap();
        let scores = Array2::zeros((1, 2));
        let mut gradients = Array2::zeros((1, 2));
        let mut hessians = Array2::zeros((1, 2));

        let one_target = Array2::zeros((1, 1));
        assert!(loss
            .compute_gradients(scores.view(), one_target.view(), gradients.view_mut(), hessians.view_mut())
            .is_err());

        let bad_label = array![[0.0, 2.0]];
        let err = loss
            .compute_gradients(scores.view(), bad_label.view(), gradients.view_mut(), hessians.view_mut())
            .unwrap_err();
        assert!(matches!(err, GamError::InvalidTarget { index: 1, .. }));
    }

    #[test]
    fn test_sample_loss_is_mean() {
        let loss = MultitaskBinaryLogLoss::<PreciseMath>::new(2).unwrap();
        let value = loss.sample_loss(array![0.0, 0.0].view(), array![1.0, 0.0].view());
        assert_abs_diff_eq!(value, 2f64.ln(), epsilon = 1e-12);
    }
}
