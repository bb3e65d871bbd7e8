//! Supported Models
//!
//! The closed set of model weight files the upstream chat executable can load.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const WEIGHTS_BASE_URL: &str = "https://the-eye.eu/public/AI/models/nomic-ai/gpt4all";

/// Model variant passed to the executable via `--model`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum SupportedModel {
    #[default]
    LoraQuantized,
    LoraUnfilteredQuantized,
    GptJ,
}

impl SupportedModel {
    pub const ALL: [SupportedModel; 3] = [
        SupportedModel::LoraQuantized,
        SupportedModel::LoraUnfilteredQuantized,
        SupportedModel::GptJ,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedModel::LoraQuantized => "gpt4all-lora-quantized",
            SupportedModel::LoraUnfilteredQuantized => "gpt4all-lora-unfiltered-quantized",
            SupportedModel::GptJ => "ggml-gpt4all-j",
        }
    }

    /// File name of the weights inside the cache directory
    pub fn file_name(&self) -> String {
        format!("{}.bin", self.as_str())
    }

    pub fn weights_url(&self) -> String {
        format!("{}/{}", WEIGHTS_BASE_URL, self.file_name())
    }
}

impl FromStr for SupportedModel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| BridgeError::UnsupportedModel(name.to_string()))
    }
}

impl TryFrom<String> for SupportedModel {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SupportedModel> for String {
    fn from(model: SupportedModel) -> String {
        model.as_str().to_string()
    }
}

impl fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_names() {
        for model in SupportedModel::ALL {
            assert_eq!(model.as_str().parse::<SupportedModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_parse_unknown_name_fails() {
        let err = "gpt-4".parse::<SupportedModel>().unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedModel(ref n) if n == "gpt-4"));
    }

    #[test]
    fn test_weights_url() {
        assert_eq!(
            SupportedModel::LoraQuantized.weights_url(),
            "https://the-eye.eu/public/AI/models/nomic-ai/gpt4all/gpt4all-lora-quantized.bin"
        );
    }

    #[test]
    fn test_serde_uses_model_name() {
        let json = serde_json::to_string(&SupportedModel::GptJ).unwrap();
        assert_eq!(json, "\"ggml-gpt4all-j\"");
        let back: SupportedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SupportedModel::GptJ);
        assert!(serde_json::from_str::<SupportedModel>("\"alpaca\"").is_err());
    }
}
