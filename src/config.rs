use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level pipeline configuration.
///
/// All options have compiled-in defaults so a run works without a config
/// file; `config.toml` overrides them when present.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub cleaning: CleaningConfig,
    pub masking: MaskingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of rows with at least one critical verdict above which the
    /// run transitions to Aborted at the post-Validate checkpoint
    pub abort_threshold: f64,
    /// Fields whose absence is a critical defect rather than a warning
    pub identity_critical_fields: Vec<String>,
    /// Run the optional cross-field consistency checks (created_date must
    /// not precede date_of_birth)
    pub cross_field_checks: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            abort_threshold: 0.5,
            identity_critical_fields: vec![
                crate::common::constants::EMAIL.to_string(),
                crate::common::constants::PHONE.to_string(),
                crate::common::constants::ACCOUNT_STATUS.to_string(),
            ],
            cross_field_checks: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Accepted date formats, tried in order; ISO first to avoid day/month
    /// ambiguity against the US format
    pub date_formats: Vec<String>,
    /// Number of digits a parseable phone number must contain
    pub phone_digits: usize,
    /// Literals treated as unparseable before any structural parsing is
    /// attempted (matched case-insensitively)
    pub sentinel_literals: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y/%m/%d".to_string(),
                "%m/%d/%Y".to_string(),
            ],
            phone_digits: 10,
            sentinel_literals: vec!["invalid_date".to_string(), "n/a".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Characters of the email local part left visible
    pub email_reveal_chars: usize,
    /// Characters of a name left visible
    pub name_reveal_chars: usize,
    /// Trailing phone digits left visible
    pub phone_reveal_digits: usize,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            email_reveal_chars: 1,
            name_reveal_chars: 1,
            phone_reveal_digits: 4,
        }
    }
}

impl Config {
    /// Load configuration from the given file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the working directory if present, otherwise
    /// fall back to compiled defaults
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pipeline.abort_threshold) {
            return Err(PipelineError::Config(format!(
                "abort_threshold must be within [0.0, 1.0], got {}",
                self.pipeline.abort_threshold
            )));
        }
        if self.cleaning.date_formats.is_empty() {
            return Err(PipelineError::Config(
                "at least one date format is required".to_string(),
            ));
        }
        if self.cleaning.phone_digits < 7 {
            return Err(PipelineError::Config(format!(
                "phone_digits must be at least 7, got {}",
                self.cleaning.phone_digits
            )));
        }
        Ok(())
    }
}
