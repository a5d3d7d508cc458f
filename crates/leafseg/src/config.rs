use std::{
    fs,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, fusion::FusionConfig, preprocessing::PreprocessConfig};

/// Locations of the two pretrained segmenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelPaths {
    /// Leaf/background segmenter
    pub leaf: PathBuf,
    /// Diseased/healthy tissue segmenter
    pub disease: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            leaf: PathBuf::from("models/espnet-leaf.onnx"),
            disease: PathBuf::from("models/espnet-disease.onnx"),
        }
    }
}

/// Full analyzer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub models: ModelPaths,
    pub preprocess: PreprocessConfig,
    pub fusion: FusionConfig,
}

impl AnalyzerConfig {
    /// JSON schema for the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyzerConfig)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save configuration, picking the format from the extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(ConfigError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    /// Reject values that would produce a non-finite tensor or a destroyed highlight
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.preprocess.validate()?;
        self.fusion.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.preprocess.input_size, 256);
        assert_eq!(config.fusion.leaf_threshold, 0.5);
        assert_eq!(config.fusion.disease_threshold, 0.5);
        assert_eq!(config.fusion.brighten_gain, 1.1);
        assert_eq!(config.fusion.darken_factor, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AnalyzerConfig::from_toml(
            r#"
            [models]
            leaf = "leaf.onnx"

            [fusion]
            darken_factor = 0.25
            "#,
        )
        .expect("Should parse");

        assert_eq!(config.models.leaf, PathBuf::from("leaf.onnx"));
        assert_eq!(config.models.disease, ModelPaths::default().disease);
        assert_eq!(config.fusion.darken_factor, 0.25);
        assert_eq!(config.fusion.brighten_gain, 1.1);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalyzerConfig::default();
        config.fusion.brighten_gain = 1.3;

        for name in ["config.toml", "config.json"] {
            let path = dir.path().join(name);
            config.to_file(&path).expect("Should save");
            assert_eq!(AnalyzerConfig::from_file(&path).expect("Should load"), config);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = AnalyzerConfig::from_file("config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFileFormat));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = AnalyzerConfig::from_json(r#"{ "fusion": { "leaf_threshold": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalyzerConfig::from_json(r#"{ "preprocess": { "pixel_std": [1.0, 0.0, 1.0] } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalyzerConfig::from_toml("[preprocess]\ninput_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_and_non_finite_gains() {
        for fusion in [
            "[fusion]\nbrighten_gain = 0.0",
            "[fusion]\ndarken_factor = 0.0",
            "[fusion]\nbrighten_gain = 0.0\ndarken_factor = 0.0",
            "[fusion]\ndarken_factor = -0.5",
            "[fusion]\nbrighten_gain = inf",
        ] {
            let err = AnalyzerConfig::from_toml(fusion).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{fusion} should be rejected");
        }

        let config = AnalyzerConfig::from_toml("[fusion]\nbrighten_gain = 1.5\ndarken_factor = 0.1").unwrap();
        assert_eq!(config.fusion.darken_factor, 0.1);
    }

    #[test]
    fn test_schema_lists_sections() {
        let schema = serde_json::to_value(AnalyzerConfig::schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("models").is_some());
        assert!(properties.get("preprocess").is_some());
        assert!(properties.get("fusion").is_some());
    }
}
