//! Configuration management for lqa-lens
//!
//! Stores settings in ~/.config/lqa-lens/config.json. The API key lives in the
//! OPENROUTER_API_KEY environment variable or the system keychain, never in
//! the config file.

use crate::error::{LqaError, LqaResult};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const KEYRING_SERVICE: &str = "lqa-lens";
const KEYRING_USERNAME: &str = "openrouter_api_key";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat completions endpoint (OpenAI-compatible)
    pub api_base_url: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub verifier_model: String,
    pub verifier_fallback_model: String,
    /// Sampling temperature; kept low for reproducible reports
    pub temperature: f32,
    pub max_tokens: u32,
    /// Timeout for a single backend HTTP call
    pub request_timeout_secs: u64,
    /// Simultaneous pipelines in batch mode
    pub max_concurrency: usize,
    /// Run the verifier pass
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            primary_model: "google/gemini-2.5-pro".to_string(),
            fallback_model: "google/gemini-2.5-flash".to_string(),
            verifier_model: "google/gemini-2.5-flash".to_string(),
            verifier_fallback_model: "google/gemini-2.0-flash-001".to_string(),
            temperature: 0.2,
            max_tokens: 16_384,
            request_timeout_secs: 120,
            max_concurrency: 5,
            verify: true,
        }
    }
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn read_keyring_key() -> Result<Option<String>, keyring::Error> {
    let entry = keyring_entry()?;
    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err),
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lqa-lens"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> LqaResult<()> {
        let dir = Self::config_dir()
            .ok_or_else(|| LqaError::config("could not determine config directory"))?;
        fs::create_dir_all(&dir)?;
        self.save_to(&dir.join("config.json"))
    }

    pub fn save_to(&self, path: &Path) -> LqaResult<()> {
        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            write_config_atomic(path, &content)?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, content)?;
        }

        Ok(())
    }

    /// Resolve the backend credential (environment first, then keychain).
    ///
    /// Missing credential is a configuration error; callers must surface it
    /// before attempting any network call.
    pub fn api_key(&self) -> LqaResult<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        match read_keyring_key() {
            Ok(Some(key)) => return Ok(key),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "failed to read API key from system keychain");
            }
        }

        Err(LqaError::config(format!(
            "no API key configured. Set {} or run 'lqa setup'.",
            API_KEY_ENV
        )))
    }

    /// Store the API key in the system keychain and verify it reads back.
    pub fn set_api_key(key: &str) -> LqaResult<()> {
        keyring_entry()
            .and_then(|entry| entry.set_password(key))
            .map_err(|e| {
                LqaError::config(format!(
                    "failed to store API key in system keychain: {}. Set {} instead.",
                    e, API_KEY_ENV
                ))
            })?;

        match read_keyring_key() {
            Ok(Some(stored)) if stored == key => Ok(()),
            Ok(_) => Err(LqaError::config(
                "API key verification failed: key was not persisted to keychain",
            )),
            Err(e) => Err(LqaError::config(format!(
                "API key verification failed: couldn't read back from keychain ({})",
                e
            ))),
        }
    }

    /// Validate API key format (OpenRouter keys start with sk-)
    pub fn validate_api_key_format(key: &str) -> bool {
        key.starts_with("sk-")
    }

    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/lqa-lens/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        warn!(error = %e, "failed to set temp config file permissions");
    }

    file.write_all(content.as_bytes())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrency, 5);
        assert!(config.verify);
        assert!(config.temperature < 0.5);
        assert_ne!(config.primary_model, config.fallback_model);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json"));
        assert_eq!(config.max_concurrency, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"primary_model": "vendor/custom", "verify": false}"#).unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.primary_model, "vendor/custom");
        assert!(!config.verify);
        assert_eq!(config.fallback_model, Config::default().fallback_model);
    }

    #[test]
    fn test_corrupt_file_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.max_concurrency, 5);
        assert!(dir.path().join("config.json.corrupt").exists());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            max_concurrency: 2,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).max_concurrency, 2);
    }

    #[test]
    fn test_validate_api_key_format() {
        assert!(Config::validate_api_key_format("sk-or-v1-abc"));
        assert!(!Config::validate_api_key_format("abc"));
    }
}
