use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default Ollama endpoint when neither config nor environment overrides it.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Default chat model submitted with every fallback request.
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Environment override for the Ollama endpoint, matching the variable the
/// Ollama CLI itself honors.
const BASE_URL_ENV: &str = "OLLAMA_HOST";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Model identifier passed to the chat endpoint (e.g., "llama3.2:latest")
    pub model: Option<String>,
    /// Base URL of the Ollama-compatible API (e.g., "http://localhost:11434")
    pub base_url: Option<String>,
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    /// Loads the config from the platform config directory. A missing file is
    /// not an error; defaults apply.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "squall", "squall")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Endpoint resolution order: `OLLAMA_HOST`, then the config file, then
    /// the built-in default.
    pub fn base_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from_path(&dir.path().join("config.toml")).expect("load");
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn loads_fields_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).expect("create");
        writeln!(file, "model = \"qwen2.5:7b\"").expect("write");
        writeln!(file, "base_url = \"http://10.0.0.5:11434\"").expect("write");

        let config = Config::load_from_path(&path).expect("load");
        assert_eq!(config.model(), "qwen2.5:7b");
        assert_eq!(config.base_url.as_deref(), Some("http://10.0.0.5:11434"));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [broken").expect("write");

        let err = Config::load_from_path(&path).expect_err("expected parse failure");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
