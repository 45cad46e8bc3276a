use crate::error::{Result, SpamError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `SPAM__CLASSIFIER__THRESHOLD=0.7`
const ENV_PREFIX: &str = "SPAM";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub ocr: OcrConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Number of analyses kept in the in-memory history
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Spam when probability is strictly greater than this
    pub threshold: f64,
    pub top_k: usize,
    pub ngram_min: usize,
    pub ngram_max: usize,
    /// Additive smoothing pseudo-count
    pub alpha: f64,
    pub stemming: bool,
    pub model_path: PathBuf,
    pub training_data_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_cmd: String,
    pub language: String,
    /// Images whose smaller side is below this get upscaled
    pub min_dimension: u32,
    /// Smaller side after upscaling
    pub target_dimension: u32,
    /// Page segmentation modes, tried in order
    pub psm_modes: Vec<u8>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5001".to_string(),
            history_capacity: 1000,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            top_k: 5,
            ngram_min: 1,
            ngram_max: 1,
            alpha: 1.0,
            stemming: false,
            model_path: PathBuf::from("spam_model.json"),
            training_data_path: PathBuf::from("training_data.json"),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            min_dimension: 100,
            target_dimension: 200,
            psm_modes: vec![6, 8, 7, 3],
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML configuration file, without env overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpamError::Config(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| SpamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer an optional TOML file (defaults to `./config.toml` when present)
    /// with `SPAM__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SpamError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SpamError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.threshold) {
            return Err(SpamError::Config(format!(
                "classifier.threshold must be within [0, 1], got {}",
                c.threshold
            )));
        }
        if c.ngram_min == 0 || c.ngram_min > c.ngram_max {
            return Err(SpamError::Config(format!(
                "invalid n-gram range {}..={}",
                c.ngram_min, c.ngram_max
            )));
        }
        if c.alpha <= 0.0 {
            return Err(SpamError::Config("classifier.alpha must be positive".to_string()));
        }

        let o = &self.ocr;
        if o.target_dimension < o.min_dimension {
            return Err(SpamError::Config(format!(
                "ocr.target_dimension ({}) must be >= ocr.min_dimension ({})",
                o.target_dimension, o.min_dimension
            )));
        }
        if o.psm_modes.is_empty() {
            return Err(SpamError::Config("ocr.psm_modes must not be empty".to_string()));
        }

        Ok(())
    }
}
