use crate::app_dirs::AppDirs;
use crate::error::CommuteError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a session without an explicit mode takes its mode from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingModePolicy {
    /// The owning commute's mode
    #[default]
    Commute,
    /// The configured `default_mode`
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub modes: Vec<String>,
    pub default_mode: String,
    /// Noise threshold for submits that do not carry a mode
    pub simple_min_secs: f64,
    /// Noise threshold for submits that carry an explicit mode
    pub mode_aware_min_secs: f64,
    pub missing_mode: MissingModePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modes: ["walk", "bike", "run", "subway", "drive"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_mode: "walk".to_string(),
            simple_min_secs: 1.0,
            mode_aware_min_secs: 3.0,
            missing_mode: MissingModePolicy::Commute,
        }
    }
}

impl Config {
    /// Reject settings the validator cannot work with
    pub fn check(&self) -> Result<(), CommuteError> {
        if self.modes.iter().all(|m| m.trim().is_empty()) {
            return Err(CommuteError::Config("at least one mode is required".into()));
        }
        if !self
            .modes
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(self.default_mode.trim()))
        {
            return Err(CommuteError::Config(format!(
                "default mode '{}' is not in the mode list",
                self.default_mode
            )));
        }
        if self.simple_min_secs < 0.0 || self.mode_aware_min_secs < 0.0 {
            return Err(CommuteError::Config(
                "minimum durations cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Noise threshold for a submit, depending on whether it names a mode
    pub fn min_duration_secs(&self, mode_aware: bool) -> f64 {
        if mode_aware {
            self.mode_aware_min_secs
        } else {
            self.simple_min_secs
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("commute_pro.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => match cfg.check() {
                Ok(()) => cfg,
                Err(e) => {
                    tracing::warn!("config {}: {e}, using defaults", self.path.display());
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("config {} is malformed: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
