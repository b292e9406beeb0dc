// SPDX-License-Identifier: MIT

//! Configuration management for Platescan

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Gemini API settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Upload limits
    #[serde(default)]
    pub upload: UploadConfig,

    /// Instruction prompt sent with every image
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: usize,
}

// Default value functions
fn default_base_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_model() -> String { "gemini-2.5-flash".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

fn default_prompt() -> String {
    "You are an expert Factory Asset Manager. Your task is to analyze the provided \
     image of a piece of factory equipment. Perform the following actions: \
     1. Identify the main piece of equipment in the image. \
     2. Carefully perform Optical Character Recognition (OCR) on any data plates, \
     labels, or text visible on the equipment. \
     3. Extract the key information: item name, model number, serial number, and \
     manufacturer. \
     4. Provide a brief description of the item. \
     5. Return the information in the specified JSON format. If a specific piece of \
     information (like a serial number) is not clearly visible or present, return \
     null for that field.".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            web: WebConfig::default(),
            upload: UploadConfig::default(),
            prompt: default_prompt(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::PlatescanError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Read the Gemini API key from the environment.
///
/// The key is never stored in the config file. A missing or empty key is a
/// hard startup failure; there is no degraded mode.
pub fn api_key_from_env() -> crate::Result<String> {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(crate::PlatescanError::Config(
            "GEMINI_API_KEY environment variable not set".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.web.port, 8080);
        assert!(config.prompt.contains("Factory Asset Manager"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.gemini.base_url, default_base_url());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.gemini.model = "gemini-2.0-pro".to_string();
        config.web.port = 9090;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.gemini.model, "gemini-2.0-pro");
        assert_eq!(loaded.web.port, 9090);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"web": {"port": 3000}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
    }
}
