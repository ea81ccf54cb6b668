//! Log loss for binary and multiclass classification.

use super::math::{DefaultMath, ExpLog};
use super::{check_batch_shapes, Loss, LossKind, LOSS_LOG_LOSS};
use crate::core::constants::{EPSILON_LOG_LOSS, ONE_SCORE};
use crate::core::dispatch::{dispatch_classes, get_learning_type_or_count_classes, ClassesVisitor};
use crate::core::error::{GamError, Result};
use crate::core::types::{FloatScore, TaskClassifier};
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Zip};
use std::marker::PhantomData;

/// Binary cross-entropy on a single logit.
///
/// - Loss: `-y * ln(p) - (1 - y) * ln(1 - p)` with `p` floored at
///   [`EPSILON_LOG_LOSS`]
/// - Gradient: `p - y`
/// - Hessian: `p * (1 - p)`
///
/// where `p = sigmoid(score)`. Labels are the class indices 0 and 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryLogLoss<M: ExpLog = DefaultMath> {
    _math: PhantomData<M>,
}

impl<M: ExpLog> BinaryLogLoss<M> {
    pub fn new() -> Self {
        BinaryLogLoss { _math: PhantomData }
    }
}

/// `-ln(max(p, EPSILON_LOG_LOSS))`.
#[inline]
pub(crate) fn floored_neg_log<M: ExpLog>(probability: FloatScore) -> FloatScore {
    -M::log(probability.max(EPSILON_LOG_LOSS))
}

/// Binary log loss of one probability.
#[inline]
pub(crate) fn binary_log_loss<M: ExpLog>(probability: FloatScore, label: FloatScore) -> FloatScore {
    label * floored_neg_log::<M>(probability) + (1.0 - label) * floored_neg_log::<M>(1.0 - probability)
}

pub(crate) fn check_binary_label(value: FloatScore) -> std::result::Result<(), &'static str> {
    if 0.0 == value || 1.0 == value {
        Ok(())
    } else {
        Err("binary labels must be 0 or 1")
    }
}

impl<M: ExpLog> Loss for BinaryLogLoss<M> {
    fn name(&self) -> &'static str {
        LOSS_LOG_LOSS
    }

    fn kind(&self) -> LossKind {
        LossKind::BinaryLogLoss
    }

    fn vector_length(&self) -> usize {
        ONE_SCORE
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
        mut gradients: ArrayViewMut1<'_, FloatScore>,
        mut hessians: ArrayViewMut1<'_, FloatScore>,
    ) {
        let p = M::sigmoid(scores[0]);
        gradients[0] = self.gradient(p, targets[0]);
        hessians[0] = self.hessian(p, targets[0]);
    }

    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore {
        binary_log_loss::<M>(M::sigmoid(scores[0]), targets[0])
    }

    fn transform(&self, mut scores: ArrayViewMut1<'_, FloatScore>) {
        scores.mapv_inplace(M::sigmoid);
    }

    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str> {
        check_binary_label(value)
    }
}

/// Softmax cross-entropy over `num_classes` logits.
///
/// Each sample carries one target, the class index stored as a float. The
/// scalar methods see one class at a time: `prediction` is that class'
/// probability and `label` is 1 for the true class and 0 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct MulticlassLogLoss<M: ExpLog = DefaultMath> {
    num_classes: usize,
    task: TaskClassifier,
    _math: PhantomData<M>,
}

impl<M: ExpLog> MulticlassLogLoss<M> {
    pub fn new(num_classes: usize) -> Result<Self> {
        if num_classes < 2 {
            return Err(GamError::invalid_parameter(
                "num_classes",
                num_classes.to_string(),
                "multiclass log loss needs at least 2 classes",
            ));
        }
        let task = TaskClassifier::classes(num_classes).ok_or_else(|| {
            GamError::invalid_parameter(
                "num_classes",
                num_classes.to_string(),
                "class count does not fit the task classifier",
            )
        })?;
        Ok(MulticlassLogLoss {
            num_classes,
            task,
            _math: PhantomData,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Softmax into the gradient row, then both derivatives in place.
#[inline]
fn multiclass_sample<M: ExpLog>(
    num_classes: usize,
    scores: ArrayView1<'_, FloatScore>,
    label: FloatScore,
    mut gradients: ArrayViewMut1<'_, FloatScore>,
    mut hessians: ArrayViewMut1<'_, FloatScore>,
) {
    M::softmax_into(scores, gradients.view_mut());
    let label = label as usize;
    for k in 0..num_classes {
        let p = gradients[k];
        hessians[k] = p * (1.0 - p);
        gradients[k] = if k == label { p - 1.0 } else { p };
    }
}

struct MulticlassGradients<'s, 't, 'g, 'h, M: ExpLog> {
    task: TaskClassifier,
    scores: ArrayView2<'s, FloatScore>,
    targets: ArrayView2<'t, FloatScore>,
    gradients: ArrayViewMut2<'g, FloatScore>,
    hessians: ArrayViewMut2<'h, FloatScore>,
    _math: PhantomData<M>,
}

impl<M: ExpLog> ClassesVisitor for MulticlassGradients<'_, '_, '_, '_, M> {
    type Output = ();

    fn visit<const N: isize>(self) {
        let MulticlassGradients {
            task,
            scores,
            targets,
            mut gradients,
            mut hessians,
            ..
        } = self;
        // constant for specialized N, so the per-class loop unrolls
        let classes = get_learning_type_or_count_classes::<N>(|| task)
            .class_count()
            .unwrap_or_else(|| scores.ncols());
        Zip::from(scores.rows())
            .and(targets.rows())
            .and(gradients.rows_mut())
            .and(hessians.rows_mut())
            .par_for_each(|score, target, gradient, hessian| {
                multiclass_sample::<M>(classes, score, target[0], gradient, hessian)
            });
    }
}

impl<M: ExpLog> Loss for MulticlassLogLoss<M> {
    fn name(&self) -> &'static str {
        LOSS_LOG_LOSS
    }

    fn kind(&self) -> LossKind {
        LossKind::MulticlassLogLoss
    }

    fn vector_length(&self) -> usize {
        self.num_classes
    }

    #[inline]
    fn gradient(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        prediction - label
    }

    #[inline]
    fn hessian(&self, prediction: FloatScore, _label: FloatScore) -> FloatScore {
        prediction * (1.0 - prediction)
    }

    /// Cross-entropy contribution of one class.
    #[inline]
    fn loss(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        label * floored_neg_log::<M>(prediction)
    }

    #[inline]
    fn sample_gradients(
        &self,
        scores: ArrayView1<'_, FloatScore>,
        targets: ArrayView1<'_, FloatScore>,
        gradients: ArrayViewMut1<'_, FloatScore>,
        hessians: ArrayViewMut1<'_, FloatScore>,
    ) {
        multiclass_sample::<M>(self.num_classes, scores, targets[0], gradients, hessians);
    }

    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore {
        let max_score = scores.fold(f64::NEG_INFINITY, |max, &score| max.max(score));
        let sum: FloatScore = scores.iter().map(|&score| M::exp(score - max_score)).sum();
        let p = M::exp(scores[targets[0] as usize] - max_score) / sum;
        floored_neg_log::<M>(p)
    }

    fn transform(&self, scores: ArrayViewMut1<'_, FloatScore>) {
        let raw = scores.to_owned();
        M::softmax_into(raw.view(), scores);
    }

    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            Err("class labels must be non-negative integers")
        } else if self.num_classes as FloatScore <= value {
            Err("class label is not below the class count")
        } else {
            Ok(())
        }
    }

    /// Routes through the class-count dispatcher so common class counts run
    /// a specialization with the count fixed at build time.
    fn compute_gradients(
        &self,
        scores: ArrayView2<'_, FloatScore>,
        targets: ArrayView2<'_, FloatScore>,
        gradients: ArrayViewMut2<'_, FloatScore>,
        hessians: ArrayViewMut2<'_, FloatScore>,
    ) -> Result<()> {
        check_batch_shapes(
            self.vector_length(),
            self.targets_per_sample(),
            &scores,
            &targets,
            &gradients,
            &hessians,
        )?;
        self.validate_targets(targets.view())?;
        dispatch_classes(
            self.task,
            MulticlassGradients::<'_, '_, '_, '_, M> {
                task: self.task,
                scores,
                targets,
                gradients,
                hessians,
                _math: PhantomData,
            },
        );
        Ok(())
    }
}
