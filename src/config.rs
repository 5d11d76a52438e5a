//! Configuration loading
//!
//! Values are resolved in this order, highest priority first:
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`RUMAH_*`)
//! 3. TOML config file
//! 4. Compiled defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::similarity::DEFAULT_LIMIT;
use crate::training::trainer::TrainingOptions;

pub const DEFAULT_CONFIG_FILE: &str = "rumah.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Sessions idle for longer than this are discarded
    pub session_idle_minutes: u64,
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_idle_minutes: 30,
            max_sessions: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trained model artifact (bincode)
    pub model_path: PathBuf,
    /// Reference listings used for comparable properties
    pub dataset_path: PathBuf,
    /// Training data; defaults to the reference dataset
    pub training_path: Option<PathBuf>,
    /// Training-loss chart written after training
    pub plot_path: PathBuf,
    pub similar_limit: usize,
    pub server: ServerConfig,
    pub training: TrainingOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_path: PathBuf::from("model_regresi_rumah.bin"),
            dataset_path: PathBuf::from("rumah.csv"),
            training_path: None,
            plot_path: PathBuf::from("training_plot.png"),
            similar_limit: DEFAULT_LIMIT,
            server: ServerConfig::default(),
            training: TrainingOptions::default(),
        }
    }
}

impl Config {
    /// Reads `path` (or `rumah.toml` when present) and applies environment
    /// overrides. An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => {
                debug!("No config file, using defaults");
                Config::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Applies `RUMAH_*` overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RUMAH_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("RUMAH_DATASET_PATH") {
            self.dataset_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("RUMAH_TRAINING_PATH") {
            self.training_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RUMAH_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("RUMAH_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| Error::Config(format!("RUMAH_PORT is not a port number: {}", v)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.similar_limit == 0 || self.similar_limit > DEFAULT_LIMIT {
            return Err(Error::Config(format!(
                "similar_limit must be between 1 and {}, got {}",
                DEFAULT_LIMIT, self.similar_limit
            )));
        }
        if self.server.session_idle_minutes == 0 || self.server.max_sessions == 0 {
            return Err(Error::Config(
                "server.session_idle_minutes and server.max_sessions must be at least 1".to_string(),
            ));
        }
        if self.training.epochs == 0 {
            return Err(Error::Config("training.epochs must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.training.test_fraction) {
            return Err(Error::Config("training.test_fraction must be in [0, 1)".to_string()));
        }
        Ok(())
    }

    pub fn training_data_path(&self) -> &Path {
        self.training_path.as_deref().unwrap_or(&self.dataset_path)
    }
}
