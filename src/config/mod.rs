//! Configuration for Quarterdeck.
//!
//! Settings load from `config.toml` in the data directory; a missing file
//! means defaults. The API key may also come from the OPENAI_API_KEY
//! environment variable, which wins over the file.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

const CONFIG_FILE: &str = "config.toml";

/// Settings for the realtime session bootstrap.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the realtime voice service
    pub api_key: Option<String>,

    /// Realtime model requested at session creation
    pub model: String,

    /// Voice requested at session creation
    pub voice: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: crate::tools::MODEL.to_string(),
            voice: crate::tools::VOICE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the data directory, falling back to defaults
    /// when no config file exists.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::InvalidInput(format!("Invalid {}: {}", CONFIG_FILE, e)))
    }

    /// Resolve the API key: environment wins over the config file.
    pub fn api_key(&self) -> Option<String> {
        env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serial_test::serial;

    #[test]
    fn test_defaults_when_file_missing() {
        let env = TestEnv::new();
        let config = Config::load(env.path()).unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.model, crate::tools::MODEL);
        assert_eq!(config.voice, crate::tools::VOICE);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let env = TestEnv::new();
        fs::write(env.path().join("config.toml"), "api_key = \"sk-test\"\n").unwrap();

        let config = Config::load(env.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, crate::tools::MODEL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let env = TestEnv::new();
        fs::write(env.path().join("config.toml"), "api_key = [broken\n").unwrap();

        assert!(matches!(
            Config::load(env.path()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    #[serial]
    fn test_env_key_wins_over_file() {
        let env = TestEnv::new();
        fs::write(env.path().join("config.toml"), "api_key = \"sk-file\"\n").unwrap();
        let config = Config::load(env.path()).unwrap();

        // SAFETY: set_var is technically unsafe on POSIX due to setenv(3) not
        // being thread-safe; #[serial] keeps env-var tests from overlapping.
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
        }
        assert_eq!(config.api_key().as_deref(), Some("sk-env"));

        unsafe {
            env::remove_var("OPENAI_API_KEY");
        }
        assert_eq!(config.api_key().as_deref(), Some("sk-file"));
    }
}
