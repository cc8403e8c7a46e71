//! Hierarchical configuration.
//!
//! Precedence (lowest to highest): programmatic defaults, `epquant.yaml` in
//! the working directory, then `EPQUANT_*` environment variables with `__`
//! separating nesting levels (e.g. `EPQUANT_SCHEDULER__MAX_WORKERS`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::convergor::{ConvergenceCriterion, KRatioComparison};
use crate::services::iterator::IterationAlgorithm;
use crate::services::quantification::QuantificationConfig;
use crate::services::scheduler::SchedulerConfig;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("Invalid convergence_limit: {0}. Must be positive")]
    InvalidConvergenceLimit(f64),

    #[error("Invalid iterator: {0}")]
    InvalidIterator(String),

    #[error("Invalid convergor: {0}. Must be one of: composition, kratio")]
    InvalidConvergor(String),

    #[error("Invalid kratio_comparison: {0}. Must be one of: measured, successive")]
    InvalidComparison(String),

    #[error("Invalid max_workers: {0}. Must be at least 1")]
    InvalidMaxWorkers(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub quantification: QuantificationSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantificationSettings {
    pub max_iterations: u32,
    pub iterator: String,
    pub convergor: String,
    pub convergence_limit: f64,
    pub kratio_comparison: String,
}

impl Default for QuantificationSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            iterator: "heinrich1972".to_string(),
            convergor: "composition".to_string(),
            convergence_limit: 1e-4,
            kratio_comparison: "measured".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub max_workers: usize,
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            output_dir: None,
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings with hierarchical merging.
    pub fn load() -> Result<Self> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file("epquant.yaml"))
            .merge(Env::prefixed("EPQUANT_").split("__"))
            .extract()
            .context("Failed to extract configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a specific file on top of the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.quantification;
        if q.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(q.max_iterations));
        }
        if q.convergence_limit <= 0.0 {
            return Err(ConfigError::InvalidConvergenceLimit(q.convergence_limit));
        }
        if q.iterator.parse::<IterationAlgorithm>().is_err() {
            return Err(ConfigError::InvalidIterator(q.iterator.clone()));
        }
        if !["composition", "kratio"].contains(&q.convergor.as_str()) {
            return Err(ConfigError::InvalidConvergor(q.convergor.clone()));
        }
        if q.kratio_comparison.parse::<KRatioComparison>().is_err() {
            return Err(ConfigError::InvalidComparison(q.kratio_comparison.clone()));
        }

        if self.scheduler.max_workers == 0 {
            return Err(ConfigError::InvalidMaxWorkers(self.scheduler.max_workers));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.logging.format.clone()));
        }

        Ok(())
    }

    /// Strategy selections resolved into a loop configuration.
    pub fn quantification_config(&self) -> Result<QuantificationConfig, ConfigError> {
        let q = &self.quantification;
        let algorithm = q
            .iterator
            .parse::<IterationAlgorithm>()
            .map_err(|_| ConfigError::InvalidIterator(q.iterator.clone()))?;

        let criterion = match q.convergor.as_str() {
            "composition" => ConvergenceCriterion::composition(q.convergence_limit),
            "kratio" => {
                let comparison = q
                    .kratio_comparison
                    .parse::<KRatioComparison>()
                    .map_err(|_| ConfigError::InvalidComparison(q.kratio_comparison.clone()))?;
                ConvergenceCriterion::kratio(q.convergence_limit, comparison)
            }
            other => return Err(ConfigError::InvalidConvergor(other.to_string())),
        }
        .map_err(|_| ConfigError::InvalidConvergenceLimit(q.convergence_limit))?;

        QuantificationConfig::new(q.max_iterations, algorithm, criterion)
            .map_err(|_| ConfigError::InvalidMaxIterations(q.max_iterations))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_workers: self.scheduler.max_workers,
            output_dir: self.scheduler.output_dir.clone(),
            overwrite: self.scheduler.overwrite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults should be valid");
        assert_eq!(settings.quantification.max_iterations, 50);
        assert_eq!(settings.scheduler.max_workers, 4);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn default_settings_resolve_to_configs() {
        let settings = Settings::default();
        let config = settings.quantification_config().unwrap();
        assert_eq!(config.algorithm, IterationAlgorithm::Heinrich1972);
        assert_eq!(config.criterion.name(), "composition");

        let scheduler = settings.scheduler_config();
        assert_eq!(scheduler.max_workers, 4);
        assert!(scheduler.output_dir.is_none());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "quantification:\n  max_iterations: 30\n  iterator: wegstein1958\nscheduler:\n  max_workers: 2"
        )
        .unwrap();
        file.flush().unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.quantification.max_iterations, 30);
        assert_eq!(settings.quantification.iterator, "wegstein1958");
        assert_eq!(settings.scheduler.max_workers, 2);
        // Unset fields keep their defaults.
        assert_eq!(settings.quantification.convergor, "composition");
    }

    #[test]
    fn kratio_convergor_resolves_with_comparison() {
        let settings = Settings {
            quantification: QuantificationSettings {
                convergor: "kratio".to_string(),
                kratio_comparison: "successive".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = settings.quantification_config().unwrap();
        assert_eq!(config.criterion.name(), "kratio");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.quantification.max_iterations = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidMaxIterations(0))
        ));

        let mut settings = Settings::default();
        settings.quantification.iterator = "newton".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidIterator(_))
        ));

        let mut settings = Settings::default();
        settings.quantification.convergence_limit = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidConvergenceLimit(_))
        ));

        let mut settings = Settings::default();
        settings.scheduler.max_workers = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidMaxWorkers(0))
        ));

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
