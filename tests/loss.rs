//! Loss registry, gradient values and metric evaluation end to end.

mod common;

use anyhow::Result;
use approx::assert_abs_diff_eq;
use common::*;
use gam_native::core::constants::{EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS, EPSILON_LOG_LOSS};
use gam_native::objective::{BinaryLogLoss, DefaultMath, MulticlassLogLoss, PreciseMath};
use gam_native::{create_loss, create_metric, GamError, Loss, LossKind, Metric, MetricKind, TaskClassifier};
use ndarray::{array, Array2};

#[test]
fn test_log_loss_gradient_at_even_odds() -> Result<()> {
    let loss = BinaryLogLoss::<PreciseMath>::new();
    assert_abs_diff_eq!(loss.gradient(0.5, 1.0), -0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(loss.gradient(0.5, 0.0), 0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(loss.hessian(0.5, 1.0), 0.25, epsilon = 1e-15);

    // a confident wrong prediction is capped instead of infinite
    let capped = loss.loss(0.0, 1.0);
    assert!(capped.is_finite());
    assert_abs_diff_eq!(capped, -EPSILON_LOG_LOSS.ln(), epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_binary_agrees_with_two_class_multiclass() -> Result<()> {
    let binary = BinaryLogLoss::<DefaultMath>::new();
    let multiclass = MulticlassLogLoss::<DefaultMath>::new(2)?;

    let mut rng = seeded_rng(17);
    let scores = random_scores(&mut rng, 200, 1, 8.0);
    let labels = binary_targets(&mut rng, 200, 1);

    let expanded = Array2::from_shape_fn((200, 2), |(i, k)| if 0 == k { 0.0 } else { scores[[i, 0]] });
    let (mut g1, mut h1) = (Array2::<f64>::zeros((200, 1)), Array2::<f64>::zeros((200, 1)));
    let (mut g2, mut h2) = (Array2::<f64>::zeros((200, 2)), Array2::<f64>::zeros((200, 2)));
    binary.compute_gradients(scores.view(), labels.view(), g1.view_mut(), h1.view_mut())?;
    multiclass.compute_gradients(expanded.view(), labels.view(), g2.view_mut(), h2.view_mut())?;

    for i in 0..200 {
        assert_abs_diff_eq!(g1[[i, 0]], g2[[i, 1]], epsilon = EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS);
        assert_abs_diff_eq!(h1[[i, 0]], h2[[i, 1]], epsilon = EPSILON_GRADIENT_FOR_BINARY_TO_MULTICLASS);
        // the two class gradients of one sample cancel
        assert_abs_diff_eq!(g2[[i, 0]] + g2[[i, 1]], 0.0, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn test_registry_name_matching() -> Result<()> {
    let regression = create_loss("  Mse\t", TaskClassifier::REGRESSION, 1)?;
    assert_eq!(regression.kind(), LossKind::SquaredError);

    let multiclass = create_loss("LOGLOSS", TaskClassifier::new(5), 1)?;
    assert_eq!(multiclass.kind(), LossKind::MulticlassLogLoss);
    assert_eq!(multiclass.vector_length(), 5);

    let multitask = create_loss("Multitask_LogLoss", TaskClassifier::new(2), 4)?;
    assert_eq!(multitask.kind(), LossKind::MultitaskBinaryLogLoss);
    assert_eq!(multitask.targets_per_sample(), 4);

    for bad in ["logloss2", "log loss", "msee", "rmse"] {
        let err = create_loss(bad, TaskClassifier::REGRESSION, 1).unwrap_err();
        assert!(matches!(err, GamError::UnknownLoss { .. }), "{}", bad);
    }
    Ok(())
}

#[test]
fn test_multiclass_batch_is_consistent() -> Result<()> {
    let loss = create_loss("logloss", TaskClassifier::new(4), 1)?;
    let mut rng = seeded_rng(3);
    let scores = random_scores(&mut rng, 64, 4, 3.0);
    let targets = class_targets(&mut rng, 64, 4);
    let mut gradients = Array2::<f64>::zeros((64, 4));
    let mut hessians = Array2::<f64>::zeros((64, 4));
    loss.compute_gradients(scores.view(), targets.view(), gradients.view_mut(), hessians.view_mut())?;

    for (row, target) in gradients.rows().into_iter().zip(targets.column(0)) {
        assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-6);
        assert!(row[*target as usize] < 0.0);
    }
    assert!(hessians.iter().all(|&h| (0.0..=0.25).contains(&h)));
    Ok(())
}

#[test]
fn test_multitask_columns_are_independent() -> Result<()> {
    let multitask = create_loss("multitask_logloss", TaskClassifier::new(2), 3)?;
    let mut rng = seeded_rng(11);
    let scores = random_scores(&mut rng, 32, 3, 4.0);
    let mut targets = binary_targets(&mut rng, 32, 3);
    let mut before = Array2::<f64>::zeros((32, 3));
    let mut hessians = Array2::<f64>::zeros((32, 3));
    multitask.compute_gradients(scores.view(), targets.view(), before.view_mut(), hessians.view_mut())?;

    targets.column_mut(1).mapv_inplace(|label| 1.0 - label);
    let mut after = Array2::<f64>::zeros((32, 3));
    multitask.compute_gradients(scores.view(), targets.view(), after.view_mut(), hessians.view_mut())?;

    assert_eq!(before.column(0), after.column(0));
    assert_eq!(before.column(2), after.column(2));
    assert!(before.column(1).iter().zip(after.column(1)).all(|(a, b)| a != b));
    Ok(())
}

#[test]
fn test_invalid_targets_are_reported() -> Result<()> {
    let loss = create_loss("logloss", TaskClassifier::new(3), 1)?;
    let scores = Array2::<f64>::zeros((3, 3));
    let targets = array![[0.0], [3.0], [1.0]];
    let mut gradients = Array2::<f64>::zeros((3, 3));
    let mut hessians = Array2::<f64>::zeros((3, 3));
    let err = loss
        .compute_gradients(scores.view(), targets.view(), gradients.view_mut(), hessians.view_mut())
        .unwrap_err();
    assert!(matches!(err, GamError::InvalidTarget { index: 1, .. }));
    Ok(())
}

#[test]
fn test_metrics_follow_losses() -> Result<()> {
    let mut rng = seeded_rng(5);

    let rmse = create_metric("RMSE", TaskClassifier::REGRESSION, 1)?;
    let targets = regression_targets(&mut rng, 50);
    assert_abs_diff_eq!(rmse.evaluate(targets.view(), targets.view())?, 0.0, epsilon = 1e-12);
    let shifted = targets.mapv(|y| y + 2.0);
    assert_abs_diff_eq!(rmse.evaluate(shifted.view(), targets.view())?, 2.0, epsilon = 1e-9);

    let log_loss = create_metric("logloss", TaskClassifier::new(3), 1)?;
    assert_eq!(log_loss.kind(), MetricKind::MulticlassLogLoss);
    let uniform = Array2::<f64>::zeros((10, 3));
    let labels = class_targets(&mut rng, 10, 3);
    assert_abs_diff_eq!(log_loss.evaluate(uniform.view(), labels.view())?, 3f64.ln(), epsilon = 1e-5);

    let multitask = create_metric("multitask_logloss", TaskClassifier::new(2), 2)?;
    let scores = Array2::<f64>::zeros((4, 2));
    let labels = binary_targets(&mut rng, 4, 2);
    assert_abs_diff_eq!(multitask.evaluate(scores.view(), labels.view())?, 2f64.ln(), epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_transform_scores_gives_distributions() -> Result<()> {
    let loss = create_loss("logloss", TaskClassifier::new(3), 1)?;
    let mut scores = array![[1.0, 2.0, 3.0], [-4.0, 0.0, 4.0]];
    loss.transform_scores(scores.view_mut())?;
    for row in scores.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
        assert!(row.iter().all(|&p| 0.0 < p && p < 1.0));
    }

    let mut wrong_width = Array2::<f64>::zeros((1, 2));
    assert!(loss.transform_scores(wrong_width.view_mut()).is_err());
    Ok(())
}
