//! Core configuration structure and builder.

use super::{
    ConfigFormat, DEFAULT_CONFIG_FILE, DEFAULT_LOSS, DEFAULT_MAX_BINS, DEFAULT_NUM_TASKS, DEFAULT_NUM_THREADS, ENV_PREFIX,
};
use crate::core::constants::REGRESSION;
use crate::core::error::{GamError, Result};
use crate::core::types::{TaskClassifier, VerbosityLevel};
use crate::core::utils::common::Common;
use crate::{config_error, ensure};
use crate::io::bit_pack::items_per_pack_for_bins;
use crate::metrics::{self, MetricFunction};
use crate::objective::{self, Loss, LossFunction};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of the numeric core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Loss registry name
    pub loss: String,
    /// Metric registry name, the loss' natural metric when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Regression sentinel, dynamic sentinel or class count
    pub learning_type_or_count_classes: TaskClassifier,
    /// Labels per sample for the multitask loss
    pub num_tasks: usize,
    /// Maximum number of bins per feature
    pub max_bins: usize,
    /// Worker threads (0 lets rayon decide)
    pub num_threads: usize,
    /// Logging verbosity
    pub verbosity: VerbosityLevel,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            loss: DEFAULT_LOSS.to_string(),
            metric: None,
            learning_type_or_count_classes: TaskClassifier::REGRESSION,
            num_tasks: DEFAULT_NUM_TASKS,
            max_bins: DEFAULT_MAX_BINS,
            num_threads: DEFAULT_NUM_THREADS,
            verbosity: VerbosityLevel::default(),
        }
    }
}

impl CoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.loss.trim().is_empty() {
            return Err(GamError::invalid_parameter("loss", "", "must name a registered loss"));
        }

        let classes = self.learning_type_or_count_classes.raw();
        if classes < REGRESSION {
            return Err(GamError::invalid_parameter(
                "learning_type_or_count_classes",
                classes.to_string(),
                "must be -1 (regression), 0 (dynamic) or a class count",
            ));
        }
        if 1 == classes {
            return Err(GamError::invalid_parameter(
                "learning_type_or_count_classes",
                "1",
                "a single class has nothing to learn",
            ));
        }

        ensure!(0 < self.num_tasks, GamError::invalid_parameter("num_tasks", "0", "must be at least 1"));
        ensure!(0 < self.max_bins, GamError::invalid_parameter("max_bins", "0", "must be at least 1"));

        if let Some(metric) = &self.metric {
            if metric.trim().is_empty() {
                return Err(GamError::invalid_parameter("metric", "", "must name a registered metric"));
            }
        }

        Ok(())
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: CoreConfig = match format {
            ConfigFormat::Toml => toml::from_str(&content)?,
            ConfigFormat::Json => serde_json::from_str(&content)?,
        };
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| GamError::config(format!("failed to serialize to TOML: {}", e)))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overridden by `GAM_NATIVE_*` environment variables
    pub fn load_from_environment() -> Result<Self> {
        let mut config = CoreConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields whose `GAM_NATIVE_*` variable is set
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, keyed by full variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let key = format!("{}{}", ENV_PREFIX, suffix);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("LOSS") {
            self.loss = value.trim().to_string();
        }
        if let Some((_, value)) = var("METRIC") {
            self.metric = Some(value.trim().to_string());
        }
        if let Some((key, value)) = var("CLASSES") {
            self.learning_type_or_count_classes = TaskClassifier::new(parse_integer(&key, &value)?);
        }
        if let Some((key, value)) = var("NUM_TASKS") {
            self.num_tasks = parse_count(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_BINS") {
            self.max_bins = parse_count(&key, &value)?;
        }
        if let Some((key, value)) = var("NUM_THREADS") {
            self.num_threads = parse_count(&key, &value)?;
        }

        self.validate()
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        if 0 == self.num_threads {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// Build the configured loss.
    pub fn create_loss(&self) -> Result<LossFunction> {
        objective::create_loss(&self.loss, self.learning_type_or_count_classes, self.num_tasks)
    }

    /// Build the configured metric, or the loss' natural metric.
    pub fn create_metric(&self) -> Result<MetricFunction> {
        let name = match &self.metric {
            Some(name) => name.clone(),
            None => metrics::default_metric_name(self.create_loss()?.kind()).to_string(),
        };
        metrics::create_metric(&name, self.learning_type_or_count_classes, self.num_tasks)
    }

    /// Pack width that fits `max_bins` bins.
    pub fn items_per_pack(&self) -> Result<isize> {
        items_per_pack_for_bins(self.max_bins)
            .ok_or_else(|| GamError::invalid_parameter("max_bins", self.max_bins.to_string(), "has no pack width"))
    }

    /// Worker pool with [`CoreConfig::effective_num_threads`] threads.
    ///
    /// Batch gradient and metric work run inside `pool.install` uses at most
    /// that many threads.
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.effective_num_threads())
            .build()
            .map_err(|e| GamError::config(format!("failed to build thread pool: {}", e)))
    }

    /// `DEFAULT_CONFIG_FILE` from the working directory if present, defaults
    /// otherwise, with environment overrides applied on top.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::load_from_file(path)?
        } else {
            log::debug!("{} not found, using defaults", DEFAULT_CONFIG_FILE);
            CoreConfig::default()
        };
        config.apply_environment_overrides()?;
        Ok(config)
    }
}

fn parse_integer(key: &str, value: &str) -> Result<isize> {
    match Common::convert_string_to_float(value) {
        Some((number, rest))
            if rest.is_empty() && number.fract() == 0.0 && isize::MIN as f64 <= number && number < isize::MAX as f64 =>
        {
            Ok(number as isize)
        }
        _ => Err(config_error!("invalid {}: {:?} is not an integer", key, value)),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    let number = parse_integer(key, value)?;
    usize::try_from(number)
        .map_err(|_| config_error!("invalid {}: {:?} is negative", key, value))
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: CoreConfig,
    validation_errors: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder {
            config: CoreConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the loss registry name
    pub fn loss<S: Into<String>>(mut self, loss: S) -> Self {
        self.config.loss = loss.into();
        self
    }

    /// Set the metric registry name
    pub fn metric<S: Into<String>>(mut self, metric: S) -> Self {
        self.config.metric = Some(metric.into());
        self
    }

    /// Set the task classifier
    pub fn learning_type_or_count_classes(mut self, classes: TaskClassifier) -> Self {
        self.config.learning_type_or_count_classes = classes;
        self
    }

    /// Classification with a fixed class count
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        if num_classes < 2 {
            self.validation_errors
                .push("num_classes must be at least 2".to_string());
        }
        match TaskClassifier::classes(num_classes) {
            Some(classes) => self.config.learning_type_or_count_classes = classes,
            None => self
                .validation_errors
                .push(format!("num_classes {} does not fit a class count", num_classes)),
        }
        self
    }

    /// Set the number of labels per sample
    pub fn num_tasks(mut self, num_tasks: usize) -> Self {
        if 0 == num_tasks {
            self.validation_errors
                .push("num_tasks must be at least 1".to_string());
        }
        self.config.num_tasks = num_tasks;
        self
    }

    /// Set the maximum number of bins per feature
    pub fn max_bins(mut self, max_bins: usize) -> Self {
        if 0 == max_bins {
            self.validation_errors
                .push("max_bins must be at least 1".to_string());
        }
        self.config.max_bins = max_bins;
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set the logging verbosity
    pub fn verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CoreConfig> {
        if !self.validation_errors.is_empty() {
            return Err(GamError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
