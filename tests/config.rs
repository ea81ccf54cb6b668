//! Configuration files, overrides and the objects built from them.

use anyhow::Result;
use gam_native::core::types::VerbosityLevel;
use gam_native::{ConfigBuilder, CoreConfig, GamError, Loss, LossKind, Metric, MetricKind, TaskClassifier};
use std::collections::HashMap;
use tempfile::TempDir;

fn multiclass_config() -> Result<CoreConfig> {
    Ok(ConfigBuilder::new()
        .loss("logloss")
        .num_classes(4)
        .max_bins(63)
        .num_threads(2)
        .verbosity(VerbosityLevel::Debug)
        .build()?)
}

#[test]
fn test_toml_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("gam.toml");
    let config = multiclass_config()?;
    config.save_to_file(&path)?;

    let loaded = CoreConfig::load_from_file(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.learning_type_or_count_classes, TaskClassifier::new(4));
    Ok(())
}

#[test]
fn test_json_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("gam.json");
    let config = ConfigBuilder::new()
        .loss("multitask_logloss")
        .num_classes(2)
        .num_tasks(3)
        .metric("multitask_logloss")
        .build()?;
    config.save_to_file(&path)?;

    let loaded = CoreConfig::load_from_file(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.create_loss()?.kind(), LossKind::MultitaskBinaryLogLoss);
    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "max_bins = 16\n")?;

    let loaded = CoreConfig::load_from_file(&path)?;
    assert_eq!(loaded.max_bins, 16);
    assert_eq!(loaded.loss, CoreConfig::default().loss);
    assert!(loaded.metric.is_none());
    Ok(())
}

#[test]
fn test_rejected_files() -> Result<()> {
    let dir = TempDir::new()?;

    let yaml = dir.path().join("gam.yaml");
    std::fs::write(&yaml, "loss: mse\n")?;
    assert_eq!(CoreConfig::load_from_file(&yaml).unwrap_err().category(), "config");

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ \"loss\": ")?;
    assert_eq!(CoreConfig::load_from_file(&broken).unwrap_err().category(), "json");

    let broken_toml = dir.path().join("broken.toml");
    std::fs::write(&broken_toml, "loss = [")?;
    assert_eq!(CoreConfig::load_from_file(&broken_toml).unwrap_err().category(), "toml");

    // parses, but a single class is not a task
    let invalid = dir.path().join("invalid.toml");
    std::fs::write(&invalid, "learning_type_or_count_classes = 1\n")?;
    assert!(CoreConfig::load_from_file(&invalid).is_err());

    let missing = dir.path().join("missing.toml");
    assert_eq!(CoreConfig::load_from_file(&missing).unwrap_err().category(), "io");
    Ok(())
}

#[test]
fn test_overrides_from_lookup() -> Result<()> {
    let variables: HashMap<&str, &str> = [
        ("GAM_NATIVE_LOSS", " logloss "),
        ("GAM_NATIVE_CLASSES", "3"),
        ("GAM_NATIVE_MAX_BINS", "1024"),
    ]
    .into_iter()
    .collect();

    let mut config = CoreConfig::default();
    config.apply_overrides(|key| variables.get(key).map(|value| value.to_string()))?;
    assert_eq!(config.loss, "logloss");
    assert_eq!(config.max_bins, 1024);
    assert_eq!(config.create_loss()?.kind(), LossKind::MulticlassLogLoss);
    assert_eq!(config.create_metric()?.kind(), MetricKind::MulticlassLogLoss);

    let mut config = CoreConfig::default();
    let err = config
        .apply_overrides(|key| (key == "GAM_NATIVE_NUM_TASKS").then(|| "two".to_string()))
        .unwrap_err();
    assert!(matches!(err, GamError::Config { .. }));
    Ok(())
}

#[test]
fn test_configured_objects() -> Result<()> {
    let config = multiclass_config()?;
    let loss = config.create_loss()?;
    assert_eq!(loss.vector_length(), 4);

    let metric = config.create_metric()?;
    assert_eq!(metric.name(), "logloss");

    // 63 bins need 6 bits
    assert_eq!(config.items_per_pack()?, (usize::BITS / 6) as isize);
    assert_eq!(config.effective_num_threads(), 2);
    Ok(())
}

#[test]
fn test_builder_collects_errors() {
    let err = ConfigBuilder::new().num_tasks(0).max_bins(0).build().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("num_tasks"));
    assert!(message.contains("max_bins"));
}

#[test]
fn test_class_count_beyond_classifier_range() {
    let err = ConfigBuilder::new()
        .loss("logloss")
        .num_classes(usize::MAX)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("num_classes"));
}
