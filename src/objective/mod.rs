//! Loss functions and their derivatives.
//!
//! A loss is chosen once by name from a case-insensitive registry and handed
//! to the training loop as a [`LossFunction`]. The training loop then calls
//! [`Loss::compute_gradients`] once per boosting round; no string lookup
//! happens past construction.
//!
//! Scalar methods ([`Loss::gradient`], [`Loss::hessian`], [`Loss::loss`])
//! work in prediction space: the raw score for regression, a probability for
//! the log-loss family. Their derivatives are taken with respect to the raw
//! (pre-transform) score, which for log loss gives the familiar `p - y` and
//! `p * (1 - p)`. Sample and batch methods take raw scores.
//!
//! Predictions are assumed finite. Detecting divergence is the caller's job.

pub mod classification;
pub mod math;
pub mod multitask;
pub mod regression;

pub use classification::{BinaryLogLoss, MulticlassLogLoss};
pub use math::{DefaultMath, ExpLog, FastMath, MixedMath, PreciseMath};
pub use multitask::MultitaskBinaryLogLoss;
pub use regression::SquaredErrorLoss;

use crate::core::constants::EPSILON_GRADIENT;
use crate::core::error::{GamError, Result};
use crate::core::types::{FloatScore, TaskClassifier, TaskKind};
use crate::core::utils::common::Common;
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry name of the squared error loss.
pub const LOSS_MSE: &str = "mse";
/// Registry name of binary or multiclass log loss, chosen by class count.
pub const LOSS_LOG_LOSS: &str = "logloss";
/// Registry name of independent per-label binary log loss.
pub const LOSS_MULTITASK_LOG_LOSS: &str = "multitask_logloss";

/// Concrete loss variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossKind {
    SquaredError,
    BinaryLogLoss,
    MulticlassLogLoss,
    MultitaskBinaryLogLoss,
}

impl LossKind {
    /// Task the variant applies to.
    pub fn task_kind(self) -> TaskKind {
        match self {
            LossKind::SquaredError => TaskKind::Regression,
            LossKind::BinaryLogLoss => TaskKind::BinaryClassification,
            LossKind::MulticlassLogLoss => TaskKind::MulticlassClassification,
            LossKind::MultitaskBinaryLogLoss => TaskKind::MultitaskBinary,
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::SquaredError => write!(f, "squared_error"),
            LossKind::BinaryLogLoss => write!(f, "binary_log_loss"),
            LossKind::MulticlassLogLoss => write!(f, "multiclass_log_loss"),
            LossKind::MultitaskBinaryLogLoss => write!(f, "multitask_binary_log_loss"),
        }
    }
}

/// Gradient and Hessian computation for one loss variant.
///
/// Implementations are stateless apart from their shape parameters and may
/// be shared across threads.
pub trait Loss: Send + Sync + fmt::Debug {
    /// Registry name the variant is reachable under.
    fn name(&self) -> &'static str;

    fn kind(&self) -> LossKind;

    fn task_kind(&self) -> TaskKind {
        self.kind().task_kind()
    }

    fn applies_to(&self, task: TaskKind) -> bool {
        self.task_kind() == task
    }

    /// Scores per sample.
    fn vector_length(&self) -> usize;

    /// Targets per sample.
    fn targets_per_sample(&self) -> usize {
        1
    }

    /// First derivative with respect to the raw score.
    fn gradient(&self, prediction: FloatScore, label: FloatScore) -> FloatScore;

    /// Second derivative with respect to the raw score.
    fn hessian(&self, prediction: FloatScore, label: FloatScore) -> FloatScore;

    /// Loss value at `prediction`.
    fn loss(&self, prediction: FloatScore, label: FloatScore) -> FloatScore;

    /// Gradients and Hessians of one sample from its raw scores.
    fn sample_gradients(
        &self,
        scores: ArrayView1<'_, FloatScore>,
        targets: ArrayView1<'_, FloatScore>,
        gradients: ArrayViewMut1<'_, FloatScore>,
        hessians: ArrayViewMut1<'_, FloatScore>,
    );

    /// Loss of one sample from its raw scores.
    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore;

    /// Map one sample's raw scores to prediction space in place.
    fn transform(&self, scores: ArrayViewMut1<'_, FloatScore>);

    /// Why `value` is not a usable target, if it is not.
    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str>;

    /// Check every target, reporting the first offender by flat index.
    fn validate_targets(&self, targets: ArrayView2<'_, FloatScore>) -> Result<()> {
        for (index, &value) in targets.iter().enumerate() {
            if let Err(reason) = self.check_target(value) {
                return Err(GamError::invalid_target(index, value, reason));
            }
        }
        Ok(())
    }

    /// Gradients and Hessians for a batch, one row per sample.
    ///
    /// `scores`, `gradients` and `hessians` are `n x vector_length`,
    /// `targets` is `n x targets_per_sample`. Rows are processed in parallel.
    fn compute_gradients(
        &self,
        scores: ArrayView2<'_, FloatScore>,
        targets: ArrayView2<'_, FloatScore>,
        mut gradients: ArrayViewMut2<'_, FloatScore>,
        mut hessians: ArrayViewMut2<'_, FloatScore>,
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

        Zip::from(scores.rows())
            .and(targets.rows())
            .and(gradients.rows_mut())
            .and(hessians.rows_mut())
            .par_for_each(|score, target, gradient, hessian| {
                self.sample_gradients(score, target, gradient, hessian)
            });
        Ok(())
    }

    /// Map a batch of raw scores to prediction space in place.
    fn transform_scores(&self, mut scores: ArrayViewMut2<'_, FloatScore>) -> Result<()> {
        if scores.ncols() != self.vector_length() {
            return Err(GamError::dimension_mismatch(
                format!("{} scores per sample", self.vector_length()),
                format!("{} scores per sample", scores.ncols()),
            ));
        }
        scores
            .axis_iter_mut(Axis(0))
            .for_each(|row| self.transform(row));
        Ok(())
    }
}

/// True when `gradient` is below [`EPSILON_GRADIENT`] in magnitude and so
/// numerically indistinguishable from zero.
#[inline]
pub fn is_negligible_gradient(gradient: FloatScore) -> bool {
    gradient.abs() < EPSILON_GRADIENT
}

/// Check the shapes of a gradient batch.
pub(crate) fn check_batch_shapes(
    vector_length: usize,
    targets_per_sample: usize,
    scores: &ArrayView2<'_, FloatScore>,
    targets: &ArrayView2<'_, FloatScore>,
    gradients: &ArrayViewMut2<'_, FloatScore>,
    hessians: &ArrayViewMut2<'_, FloatScore>,
) -> Result<()> {
    let samples = scores.nrows();
    let expected_scores = (samples, vector_length);
    if scores.dim() != expected_scores {
        return Err(GamError::dimension_mismatch(
            format!("scores of shape {:?}", expected_scores),
            format!("{:?}", scores.dim()),
        ));
    }
    if targets.dim() != (samples, targets_per_sample) {
        return Err(GamError::dimension_mismatch(
            format!("targets of shape {:?}", (samples, targets_per_sample)),
            format!("{:?}", targets.dim()),
        ));
    }
    if gradients.dim() != expected_scores || hessians.dim() != expected_scores {
        return Err(GamError::dimension_mismatch(
            format!("gradients and hessians of shape {:?}", expected_scores),
            format!("{:?} and {:?}", gradients.dim(), hessians.dim()),
        ));
    }
    Ok(())
}

/// Loss variant chosen at setup, dispatched by `match` in the hot loop.
#[derive(Debug, Clone)]
pub enum LossFunction {
    SquaredError(SquaredErrorLoss),
    BinaryLogLoss(BinaryLogLoss),
    MulticlassLogLoss(MulticlassLogLoss),
    MultitaskBinaryLogLoss(MultitaskBinaryLogLoss),
}

macro_rules! delegate {
    ($self:ident, $loss:ident => $call:expr) => {
        match $self {
            LossFunction::SquaredError($loss) => $call,
            LossFunction::BinaryLogLoss($loss) => $call,
            LossFunction::MulticlassLogLoss($loss) => $call,
            LossFunction::MultitaskBinaryLogLoss($loss) => $call,
        }
    };
}

impl Loss for LossFunction {
    fn name(&self) -> &'static str {
        delegate!(self, loss => loss.name())
    }

    fn kind(&self) -> LossKind {
        delegate!(self, loss => loss.kind())
    }

    fn vector_length(&self) -> usize {
        delegate!(self, loss => loss.vector_length())
    }

    fn targets_per_sample(&self) -> usize {
        delegate!(self, loss => loss.targets_per_sample())
    }

    #[inline]
    fn gradient(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        delegate!(self, loss => loss.gradient(prediction, label))
    }

    #[inline]
    fn hessian(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        delegate!(self, loss => loss.hessian(prediction, label))
    }

    #[inline]
    fn loss(&self, prediction: FloatScore, label: FloatScore) -> FloatScore {
        delegate!(self, loss => loss.loss(prediction, label))
    }

    #[inline]
    fn sample_gradients(
        &self,
        scores: ArrayView1<'_, FloatScore>,
        targets: ArrayView1<'_, FloatScore>,
        gradients: ArrayViewMut1<'_, FloatScore>,
        hessians: ArrayViewMut1<'_, FloatScore>,
    ) {
        delegate!(self, loss => loss.sample_gradients(scores, targets, gradients, hessians))
    }

    fn sample_loss(&self, scores: ArrayView1<'_, FloatScore>, targets: ArrayView1<'_, FloatScore>) -> FloatScore {
        delegate!(self, loss => loss.sample_loss(scores, targets))
    }

    fn transform(&self, scores: ArrayViewMut1<'_, FloatScore>) {
        delegate!(self, loss => loss.transform(scores))
    }

    fn check_target(&self, value: FloatScore) -> std::result::Result<(), &'static str> {
        delegate!(self, loss => loss.check_target(value))
    }

    fn compute_gradients(
        &self,
        scores: ArrayView2<'_, FloatScore>,
        targets: ArrayView2<'_, FloatScore>,
        gradients: ArrayViewMut2<'_, FloatScore>,
        hessians: ArrayViewMut2<'_, FloatScore>,
    ) -> Result<()> {
        delegate!(self, loss => loss.compute_gradients(scores, targets, gradients, hessians))
    }
}

struct LossRegistration {
    name: &'static str,
    build: fn(TaskClassifier, usize) -> Result<LossFunction>,
}

const LOSS_REGISTRY: [LossRegistration; 3] = [
    LossRegistration {
        name: LOSS_MSE,
        build: build_squared_error,
    },
    LossRegistration {
        name: LOSS_LOG_LOSS,
        build: build_log_loss,
    },
    LossRegistration {
        name: LOSS_MULTITASK_LOG_LOSS,
        build: build_multitask_log_loss,
    },
];

fn build_squared_error(task: TaskClassifier, _num_tasks: usize) -> Result<LossFunction> {
    if !task.is_regression() {
        return Err(GamError::config(format!(
            "loss {} applies to regression, not {}",
            LOSS_MSE, task
        )));
    }
    Ok(LossFunction::SquaredError(SquaredErrorLoss::new()))
}

fn build_log_loss(task: TaskClassifier, _num_tasks: usize) -> Result<LossFunction> {
    if task.is_regression() {
        return Err(GamError::config(format!(
            "loss {} applies to classification, not regression",
            LOSS_LOG_LOSS
        )));
    }
    let classes = task.class_count().ok_or_else(|| {
        GamError::config("the class count must be resolved before the loss is built")
    })?;
    if task.is_binary() {
        Ok(LossFunction::BinaryLogLoss(BinaryLogLoss::new()))
    } else {
        Ok(LossFunction::MulticlassLogLoss(MulticlassLogLoss::new(classes)?))
    }
}

fn build_multitask_log_loss(task: TaskClassifier, num_tasks: usize) -> Result<LossFunction> {
    if task.is_regression() {
        return Err(GamError::config(format!(
            "loss {} applies to classification, not regression",
            LOSS_MULTITASK_LOG_LOSS
        )));
    }
    Ok(LossFunction::MultitaskBinaryLogLoss(MultitaskBinaryLogLoss::new(num_tasks)?))
}

/// Names accepted by [`create_loss`].
pub fn registered_loss_names() -> Vec<&'static str> {
    LOSS_REGISTRY.iter().map(|registration| registration.name).collect()
}

/// Build the loss registered under `name` for `task`.
///
/// Matching ignores surrounding whitespace and ASCII case. `num_tasks` is
/// only read by the multitask loss.
pub fn create_loss(name: &str, task: TaskClassifier, num_tasks: usize) -> Result<LossFunction> {
    let registration = LOSS_REGISTRY
        .iter()
        .find(|registration| Common::is_name_match(name, registration.name))
        .ok_or_else(|| {
            log::debug!("registered losses: {}", Common::join(&registered_loss_names(), ", "));
            GamError::unknown_loss(name)
        })?;
    let loss = (registration.build)(task, num_tasks)?;
    log::info!(
        "loss {:?} resolved to {} ({} scores per sample)",
        name.trim(),
        loss.kind(),
        loss.vector_length()
    );
    Ok(loss)
}
