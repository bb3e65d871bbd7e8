//! Bridge Configuration
//!
//! Defaults, overlaid by an optional JSON file (`GPT4ALL_CONFIG`), overlaid by
//! environment variables. `.env.local` in the working directory fills in any
//! variable the process environment lacks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::models::SupportedModel;
use crate::session::FramingConfig;

pub const ENV_CONFIG: &str = "GPT4ALL_CONFIG";
pub const ENV_MODEL: &str = "GPT4ALL_MODEL";
pub const ENV_HOME: &str = "GPT4ALL_HOME";
pub const ENV_FORCE_DOWNLOAD: &str = "GPT4ALL_FORCE_DOWNLOAD";
pub const ENV_DECODER: &str = "GPT4ALL_DECODER";

/// Decoder options forwarded to the executable as `--<key> <value>` flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>", into = "BTreeMap<String, String>")]
pub struct DecoderConfig {
    options: BTreeMap<String, String>,
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option. Leading dashes on the key are dropped.
    pub fn set(mut self, key: impl AsRef<str>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl ToString) {
        let key = key.as_ref().trim().trim_start_matches('-');
        if key.is_empty() {
            return;
        }
        self.options.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Command-line flags in key order
    pub fn to_args(&self) -> Vec<String> {
        self.options
            .iter()
            .flat_map(|(k, v)| [format!("--{}", k), v.clone()])
            .collect()
    }

    /// Parse `key=value,key=value`
    pub fn parse_pairs(pairs: &str) -> BridgeResult<Self> {
        let mut config = Self::new();
        for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| BridgeError::Config(format!("Invalid decoder option: {}", pair)))?;
            config.insert(key, value.trim());
        }
        Ok(config)
    }
}

impl From<BTreeMap<String, serde_json::Value>> for DecoderConfig {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        let mut config = Self::new();
        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => config.insert(key, s),
                other => config.insert(key, other),
            }
        }
        config
    }
}

impl From<DecoderConfig> for BTreeMap<String, String> {
    fn from(config: DecoderConfig) -> Self {
        config.options
    }
}

/// Top-level configuration record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gpt4AllConfig {
    pub model: SupportedModel,
    /// Overrides `~/.nomic`
    pub cache_dir: Option<PathBuf>,
    pub decoder: DecoderConfig,
    pub force_download: bool,
    pub framing: FramingConfig,
}

impl Gpt4AllConfig {
    pub fn with_model(model: SupportedModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Load from the process environment, `.env.local` and `GPT4ALL_CONFIG`
    pub fn load() -> BridgeResult<Self> {
        let dotenv = std::env::current_dir()
            .map(|dir| read_env_file(&dir.join(".env.local")))
            .unwrap_or_default();

        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| dotenv.get(key).cloned())
        };

        Self::from_sources(lookup)
    }

    /// Build from a variable lookup; the JSON file named by `GPT4ALL_CONFIG`
    /// is read first, then individual variables override it.
    pub fn from_sources(lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(model) = lookup(ENV_MODEL) {
            config.model = model.parse()?;
        }

        if let Some(home) = lookup(ENV_HOME) {
            config.cache_dir = Some(PathBuf::from(home));
        }

        if let Some(force) = lookup(ENV_FORCE_DOWNLOAD) {
            config.force_download = parse_bool(&force)
                .ok_or_else(|| BridgeError::Config(format!("{} must be a boolean, got {}", ENV_FORCE_DOWNLOAD, force)))?;
        }

        if let Some(decoder) = lookup(ENV_DECODER) {
            for (key, value) in DecoderConfig::parse_pairs(&decoder)?.options {
                config.decoder.insert(key, value);
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read `KEY=value` lines; missing file yields an empty map
fn read_env_file(path: &Path) -> BTreeMap<String, String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_decoder_args_are_sorted_and_prefixed() {
        let decoder = DecoderConfig::new().set("top_k", 40).set("--temp", 0.2);
        assert_eq!(decoder.to_args(), vec!["--temp", "0.2", "--top_k", "40"]);
    }

    #[test]
    fn test_decoder_parse_pairs() {
        let decoder = DecoderConfig::parse_pairs("temp=0.7, n_predict = 128,").unwrap();
        assert_eq!(decoder.get("temp"), Some("0.7"));
        assert_eq!(decoder.get("n_predict"), Some("128"));
        assert!(DecoderConfig::parse_pairs("temp").is_err());
    }

    #[test]
    fn test_decoder_from_json_accepts_numbers() {
        let decoder: DecoderConfig = serde_json::from_str(r#"{"temp": 0.1, "seed": 7, "prompt": "hi"}"#).unwrap();
        assert_eq!(decoder.get("temp"), Some("0.1"));
        assert_eq!(decoder.get("seed"), Some("7"));
        assert_eq!(decoder.get("prompt"), Some("hi"));
    }

    #[test]
    fn test_defaults() {
        let config = Gpt4AllConfig::from_sources(|_| None).unwrap();
        assert_eq!(config.model, SupportedModel::LoraQuantized);
        assert!(config.cache_dir.is_none());
        assert!(!config.force_download);
        assert!(config.decoder.is_empty());
        assert_eq!(config.framing.idle_timeout(), Duration::from_millis(4000));
    }

    #[test]
    fn test_env_overrides() {
        let config = Gpt4AllConfig::from_sources(lookup_from(&[
            (ENV_MODEL, "ggml-gpt4all-j"),
            (ENV_HOME, "/tmp/nomic"),
            (ENV_FORCE_DOWNLOAD, "yes"),
            (ENV_DECODER, "temp=0.3"),
        ]))
        .unwrap();
        assert_eq!(config.model, SupportedModel::GptJ);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/nomic")));
        assert!(config.force_download);
        assert_eq!(config.decoder.get("temp"), Some("0.3"));
    }

    #[test]
    fn test_env_rejects_unknown_model() {
        let err = Gpt4AllConfig::from_sources(lookup_from(&[(ENV_MODEL, "vicuna")])).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedModel(_)));
    }

    #[test]
    fn test_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "model": "gpt4all-lora-unfiltered-quantized",
                "decoder": {"temp": 0.5, "top_k": 20},
                "framing": {"idle_timeout_ms": 250}
            }"#,
        )
        .unwrap();

        let path_str = path.to_string_lossy().to_string();
        let config = Gpt4AllConfig::from_sources(lookup_from(&[
            (ENV_CONFIG, path_str.as_str()),
            (ENV_DECODER, "temp=0.9"),
        ]))
        .unwrap();

        assert_eq!(config.model, SupportedModel::LoraUnfilteredQuantized);
        assert_eq!(config.decoder.get("temp"), Some("0.9"));
        assert_eq!(config.decoder.get("top_k"), Some("20"));
        assert_eq!(config.framing.idle_timeout(), Duration::from_millis(250));
        assert_eq!(config.framing.marker, Some('>'));
    }

    #[test]
    fn test_read_env_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env.local");
        std::fs::write(&path, "# comment\nGPT4ALL_MODEL=\"ggml-gpt4all-j\"\n\nJUNK\n").unwrap();
        let vars = read_env_file(&path);
        assert_eq!(vars.get(ENV_MODEL).map(String::as_str), Some("ggml-gpt4all-j"));
        assert_eq!(vars.len(), 1);
        assert!(read_env_file(&dir.path().join("missing")).is_empty());
    }
}
