//! Run configuration: the feature catalog and training parameters.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::training::TrainParams;

/// Errors loading the config file. All of these abort before any data loads.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid JSON")]
    Json(#[from] serde_json::Error),
    #[error("config declares no features")]
    NoFeatures,
}

/// Feature catalog plus training parameters.
///
/// JSON document:
///
/// ```json
/// {
///   "features": ["clicks", "dwell_time", "position"],
///   "training": { "num_trees": 200, "learning_rate": 0.05 }
/// }
/// ```
///
/// Feature position in `features` is the feature id used in every data row
/// and in the importance dump. The `training` section is optional, as is
/// every field inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ordered feature names; position = feature id.
    pub features: Vec<String>,
    #[serde(default)]
    pub training: TrainParams,
}

impl Config {
    /// Load and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        if config.features.is_empty() {
            return Err(ConfigError::NoFeatures);
        }
        Ok(config)
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature_name(&self, id: usize) -> &str {
        &self.features[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_features_and_partial_training_params() {
        let file = write_config(
            r#"{"features": ["a", "b"], "training": {"num_trees": 7}}"#,
        );
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.n_features(), 2);
        assert_eq!(config.feature_name(1), "b");
        assert_eq!(config.training.num_trees, 7);
        // Unspecified fields keep their defaults.
        assert_eq!(config.training.max_depth, TrainParams::default().max_depth);
    }

    #[test]
    fn training_section_is_optional() {
        let file = write_config(r#"{"features": ["a"]}"#);
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.training, TrainParams::default());
    }

    #[test]
    fn empty_feature_list_is_rejected() {
        let file = write_config(r#"{"features": []}"#);
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::NoFeatures)
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::from_file("/nonexistent/config.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let file = write_config("{not json");
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
