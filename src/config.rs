// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::StreamConstraints;
use crate::constants::{capture, endpoint, retry};
use crate::errors::{AppError, AppResult};
use crate::media::FrameEncoder;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
pub const APP_DIR: &str = "insight-camera";
/// Config file name inside [`APP_DIR`]
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the endpoint credential
pub const ENV_API_KEY: &str = "INSIGHT_CAMERA_API_KEY";
/// Checked when [`ENV_API_KEY`] is unset
pub const ENV_API_KEY_FALLBACK: &str = "GEMINI_API_KEY";
pub const ENV_ENDPOINT: &str = "INSIGHT_CAMERA_ENDPOINT";
pub const ENV_MODEL: &str = "INSIGHT_CAMERA_MODEL";
pub const ENV_DEVICE: &str = "INSIGHT_CAMERA_DEVICE";

/// Requested capture format
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
    /// JPEG quality (1-100) for raw frames
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            jpeg_quality: capture::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Attempt budget shared by camera start and analysis calls
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            initial_backoff_ms: retry::INITIAL_BACKOFF_MS,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference API
    pub endpoint_url: String,
    /// Model id used in `models/{model}:generateContent`
    pub model: String,
    /// Endpoint credential; absent is a valid state
    pub api_key: Option<String>,
    /// V4L2 device path
    pub camera_device: String,
    pub capture: CaptureSettings,
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: endpoint::DEFAULT_URL.to_string(),
            model: endpoint::DEFAULT_MODEL.to_string(),
            api_key: None,
            camera_device: capture::DEFAULT_DEVICE.to_string(),
            capture: CaptureSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("model", &self.model)
            .field("api_key", &self.credential().map(|_| "<redacted>"))
            .field("camera_device", &self.camera_device)
            .field("capture", &self.capture)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/insight-camera/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Resolve the config file (if any) and the process environment
    pub fn load() -> AppResult<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank(ENV_API_KEY).or_else(|| non_blank(ENV_API_KEY_FALLBACK)) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_blank(ENV_ENDPOINT) {
            self.endpoint_url = url;
        }
        if let Some(model) = non_blank(ENV_MODEL) {
            self.model = model;
        }
        if let Some(device) = non_blank(ENV_DEVICE) {
            self.camera_device = device;
        }
    }

    /// Credential, if configured and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.credential().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_backoff_ms),
        )
    }

    pub fn encoder(&self) -> FrameEncoder {
        FrameEncoder::new(self.capture.jpeg_quality)
    }

    pub fn stream_constraints(&self) -> StreamConstraints {
        StreamConstraints {
            width: self.capture.width,
            height: self.capture.height,
            ..StreamConstraints::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"model":"custom-model"}"#).unwrap();
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.endpoint_url, endpoint::DEFAULT_URL);
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn test_env_key_takes_precedence_over_fallback() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup(&[
            (ENV_API_KEY, "primary"),
            (ENV_API_KEY_FALLBACK, "fallback"),
        ]));
        assert_eq!(config.credential(), Some("primary"));
    }

    #[test]
    fn test_fallback_key_and_blank_primary() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup(&[(ENV_API_KEY, "  "), (ENV_API_KEY_FALLBACK, "fb")]));
        assert_eq!(config.credential(), Some("fb"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.credential(), None);
    }

    #[test]
    fn test_redaction() {
        let config = Config {
            api_key: Some("secret-key".to_string()),
            ..Config::default()
        };
        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("secret-key"));
        assert!(!format!("{:?}", config).contains("secret-key"));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let config = Config {
            retry: RetrySettings {
                max_attempts: 0,
                initial_backoff_ms: 250,
            },
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
    }
}
