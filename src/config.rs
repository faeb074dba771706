use crate::ids::{DisplayIdGenerator, DEFAULT_PREFIX, DEFAULT_WIDTH};
use crate::stats::STUDENT_COUNT_FALLBACK;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub roster: RosterConfig,
    pub display: DisplayConfig,
    pub ids: IdsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// REST base, e.g. `http://localhost:5000/api`. Connect at startup when set.
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 10,
            connect_timeout_seconds: 5,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Choices offered by the class form. An empty list disables the check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub grades: Vec<String>,
    pub years: Vec<String>,
    pub teachers: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            grades: (1..=9).map(|n| format!("{n}º Ano")).collect(),
            years: vec!["2024".to_string(), "2025".to_string()],
            teachers: vec![
                "Professor Exemplo".to_string(),
                "Maria Silva".to_string(),
                "João Santos".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub student_count_fallback: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            student_count_fallback: STUDENT_COUNT_FALLBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// Generate the display id from the local store size.
    #[default]
    Local,
    /// Omit it from the create payload; the remote store assigns it.
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    pub prefix: String,
    pub width: usize,
    pub policy: IdPolicy,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            width: DEFAULT_WIDTH,
            policy: IdPolicy::Local,
        }
    }
}

impl IdsConfig {
    pub fn generator(&self) -> DisplayIdGenerator {
        DisplayIdGenerator::new(self.prefix.clone(), self.width)
    }
}

impl Config {
    /// `~/.config/chamadad/config.toml` or the platform equivalent.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("chamadad").join("config.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ids.prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "ids.prefix must not be empty".to_string(),
            });
        }
        if self.ids.width == 0 {
            return Err(ConfigError::ValidationError {
                message: "ids.width must be at least 1".to_string(),
            });
        }
        if let Some(url) = &self.remote.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError {
                    message: format!("remote.base_url must be an http(s) URL, got '{url}'"),
                });
            }
        }
        if self.remote.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "remote.timeout_seconds must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.roster.grades.len(), 9);
        assert_eq!(cfg.roster.grades[5], "6º Ano");
        assert_eq!(cfg.display.student_count_fallback, 5);
        assert_eq!(cfg.ids.generator().next(2), "EST003");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[remote]
base_url = "http://localhost:5000/api"

[ids]
policy = "server"
"#,
        )
        .expect("write config");

        let cfg = Config::load_from(&path).expect("load");
        assert_eq!(cfg.remote.base_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(cfg.remote.timeout_seconds, 10);
        assert_eq!(cfg.ids.policy, IdPolicy::Server);
        assert_eq!(cfg.ids.prefix, "EST");
    }

    #[test]
    fn rejects_zero_width_and_bad_url() {
        let mut cfg = Config::default();
        cfg.ids.width = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError { .. })));

        let mut cfg = Config::default();
        cfg.remote.base_url = Some("localhost:5000".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ids\nwidth = ").expect("write config");
        let err = Config::load_from(&path).expect_err("parse error");
        assert!(err.to_string().contains("config.toml"));
    }
}
