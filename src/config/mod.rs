//! Configuration loading
//!
//! Precedence is defaults, then a TOML file, then environment variables.
//! The file is `$BFF_CONFIG` when set, otherwise `bff.toml` in the working
//! directory if it exists. Thresholds and encoder settings are not
//! configurable; only the classifier strategy, logging and the filtering
//! stage are.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::domain::classifier::ClassifierKind;
use crate::error::{BffError, BffResult};
use crate::utils::logging::LoggingConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "BFF_CONFIG";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "bff.toml";

/// Deinterlacing filter used unless configured otherwise
pub const DEFAULT_DEINTERLACE_FILTER: &str = "yadif=deint=interlaced";

/// Progress is logged every this many video frames by default
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BffConfig {
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

/// Black frame classifier selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub strategy: ClassifierKind,
}

/// Filtering and reporting options of the frame loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Run decoded video through the deinterlacing filter graph
    pub deinterlace: bool,
    /// libavfilter description placed between the buffer source and sink
    pub deinterlace_filter: String,
    /// Log progress every N video frames
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deinterlace: true,
            deinterlace_filter: DEFAULT_DEINTERLACE_FILTER.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl BffConfig {
    /// Load from the process environment and working directory
    pub fn load() -> BffResult<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::load_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };

        let overrides = config.apply_env_overrides(|key| std::env::var(key).ok())?;
        if overrides > 0 {
            debug!("Applied {} environment variable overrides", overrides);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn load_file(path: &Path) -> BffResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BffError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| BffError::Config {
            message: format!("{} ({})", e, path.display()),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content; missing sections and keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML config: {}", e))
    }

    /// Apply `BFF_*` overrides obtained through `lookup`; returns how many were applied
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> BffResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;

        if let Some(value) = lookup("BFF_CLASSIFIER") {
            self.classifier.strategy = parse_override("BFF_CLASSIFIER", &value)?;
            applied += 1;
        }
        if let Some(value) = lookup("BFF_LOG_LEVEL") {
            self.logging.level = parse_override("BFF_LOG_LEVEL", &value)?;
            applied += 1;
        }
        if let Some(value) = lookup("BFF_LOG_FORMAT") {
            self.logging.format = parse_override("BFF_LOG_FORMAT", &value)?;
            applied += 1;
        }
        if let Some(value) = lookup("BFF_DEINTERLACE") {
            self.pipeline.deinterlace = parse_override("BFF_DEINTERLACE", &value)?;
            applied += 1;
        }
        if let Some(value) = lookup("BFF_PROGRESS_INTERVAL") {
            self.pipeline.progress_interval = parse_override("BFF_PROGRESS_INTERVAL", &value)?;
            applied += 1;
        }

        Ok(applied)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> BffResult<()> {
        if self.pipeline.progress_interval == 0 {
            return Err(BffError::Config {
                message: "pipeline.progress_interval must be at least 1".to_string(),
            });
        }
        if self.pipeline.deinterlace && self.pipeline.deinterlace_filter.trim().is_empty() {
            return Err(BffError::Config {
                message: "pipeline.deinterlace_filter cannot be empty while deinterlacing is enabled".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> BffResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| BffError::Config {
        message: format!("{}={}: {}", key, value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::{LogFormat, LogLevel};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BffConfig::default();
        assert_eq!(config.classifier.strategy, ClassifierKind::Proportional);
        assert!(config.pipeline.deinterlace);
        assert_eq!(config.pipeline.deinterlace_filter, DEFAULT_DEINTERLACE_FILTER);
        assert_eq!(config.pipeline.progress_interval, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BffConfig::from_toml_str(
            r#"
            [classifier]
            strategy = "statistical"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.strategy, ClassifierKind::Statistical);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(BffConfig::from_toml_str("[classifier]\nmean_threshold = 20").is_err());
        assert!(BffConfig::from_toml_str("[classifier]\nstrategy = \"median\"").is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = BffConfig::from_toml_str("[pipeline]\nprogress_interval = 25").unwrap();
        let applied = config
            .apply_env_overrides(env(&[
                ("BFF_CLASSIFIER", "statistical"),
                ("BFF_LOG_LEVEL", "debug"),
                ("BFF_DEINTERLACE", "false"),
                ("BFF_PROGRESS_INTERVAL", "10"),
            ]))
            .unwrap();
        assert_eq!(applied, 4);
        assert_eq!(config.classifier.strategy, ClassifierKind::Statistical);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(!config.pipeline.deinterlace);
        assert_eq!(config.pipeline.progress_interval, 10);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = BffConfig::default();
        let err = config
            .apply_env_overrides(env(&[("BFF_PROGRESS_INTERVAL", "often")]))
            .unwrap_err();
        assert!(err.to_string().contains("BFF_PROGRESS_INTERVAL"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = BffConfig::default();
        config.pipeline.progress_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_filter() {
        let mut config = BffConfig::default();
        config.pipeline.deinterlace_filter = "  ".to_string();
        assert!(config.validate().is_err());
        config.pipeline.deinterlace = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bff.toml");
        std::fs::write(&path, "[pipeline]\ndeinterlace = false\n").unwrap();
        let config = BffConfig::load_file(&path).unwrap();
        assert!(!config.pipeline.deinterlace);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(BffConfig::load_file(&missing), Err(BffError::Config { .. })));
    }
}
