use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration problems. These are fatal: a run never starts with a bad config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// DatasetConfig – the semantic-kitti.yaml file
// ---------------------------------------------------------------------------

/// Which dataset split to read sequence numbers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Split {
    #[default]
    Train,
    Valid,
    Test,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default)]
    pub train: Vec<u32>,
    #[serde(default)]
    pub valid: Vec<u32>,
    #[serde(default)]
    pub test: Vec<u32>,
}

/// Class names, class colours and sequence splits.
///
/// Extra keys found in the SemanticKITTI file (`content`, `learning_map`, ...)
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub labels: BTreeMap<u32, String>,
    #[serde(default)]
    pub color_map: BTreeMap<u32, [u8; 3]>,
    pub split: SplitConfig,
}

impl DatasetConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg: DatasetConfig = read_yaml(path)?;
        if cfg.labels.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "'{}' defines no labels",
                path.display()
            )));
        }
        Ok(cfg)
    }

    /// Sequence directory names for a split, zero-padded to two digits.
    pub fn sequences(&self, split: Split) -> Vec<String> {
        let ids = match split {
            Split::Train => &self.split.train,
            Split::Valid => &self.split.valid,
            Split::Test => &self.split.test,
        };
        ids.iter().map(|id| format!("{id:02}")).collect()
    }

    /// Human-readable name of a class, falling back to its numeric id.
    pub fn class_name(&self, id: u32) -> String {
        self.labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig – tunables of the similarity metric and the analyzer
// ---------------------------------------------------------------------------

/// Weights of the composite similarity score. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub spatial: f64,
    pub intensity: f64,
    pub height: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            spatial: 0.4,
            intensity: 0.3,
            height: 0.3,
        }
    }
}

/// Parameters of the per-frame similarity metric and of the sequence analyzer.
///
/// Every field has a default matching the tuned detector, so a params file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bounds of the radial distance bands, ascending (metres).
    /// Points beyond the second-to-last bound fall into the last band.
    /// Default: [10, 20, 30, 40, 50]
    pub band_upper_bounds: Vec<f64>,

    /// Bands where either class has fewer points are skipped.
    /// Default: 10
    pub min_points_per_band: usize,

    /// Bin count of the intensity and height histograms.
    /// Default: 20
    pub histogram_bins: usize,

    /// Fixed histogram range for intensity values.
    /// Default: [0.0, 1.0]
    pub intensity_range: [f64; 2],

    /// Added to histogram-overlap denominators.
    /// Default: 1e-10
    pub epsilon: f64,

    pub weights: ScoreWeights,

    /// A pair is flagged on a frame when its score is strictly above this.
    /// Default: 0.5
    pub anomaly_threshold: f64,

    /// Maximum number of flagged point indices kept per class pair.
    /// Default: 1000
    pub max_anomalies: usize,

    /// Scratch buffers are released every this many frames.
    /// Default: 50
    pub release_interval: usize,

    /// Class names that never take part in a pair.
    /// Default: ["unlabeled", "outlier"]
    pub excluded_classes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            band_upper_bounds: vec![10.0, 20.0, 30.0, 40.0, 50.0],
            min_points_per_band: 10,
            histogram_bins: 20,
            intensity_range: [0.0, 1.0],
            epsilon: 1e-10,
            weights: ScoreWeights::default(),
            anomaly_threshold: 0.5,
            max_anomalies: 1000,
            release_interval: 50,
            excluded_classes: vec!["unlabeled".to_string(), "outlier".to_string()],
        }
    }
}

impl AnalysisConfig {
    /// Load overrides from a YAML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg: AnalysisConfig = read_yaml(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.band_upper_bounds.is_empty() {
            return invalid("at least one distance band is required".into());
        }
        if self
            .band_upper_bounds
            .windows(2)
            .any(|w| !(w[0] < w[1]))
        {
            return invalid(format!(
                "band upper bounds must be strictly ascending, got {:?}",
                self.band_upper_bounds
            ));
        }
        if self.histogram_bins == 0 {
            return invalid("histogram_bins must be positive".into());
        }
        let [lo, hi] = self.intensity_range;
        if !(lo < hi) {
            return invalid(format!("intensity_range [{lo}, {hi}] is empty"));
        }
        let w = self.weights;
        if w.spatial < 0.0 || w.intensity < 0.0 || w.height < 0.0 {
            return invalid(format!("score weights must be non-negative, got {w:?}"));
        }
        let sum = w.spatial + w.intensity + w.height;
        if (sum - 1.0).abs() > 1e-6 {
            return invalid(format!("score weights must sum to 1, got {sum}"));
        }
        if !(0.0..=1.0).contains(&self.anomaly_threshold) {
            return invalid(format!(
                "anomaly_threshold {} is outside [0, 1]",
                self.anomaly_threshold
            ));
        }
        Ok(())
    }

    pub fn band_count(&self) -> usize {
        self.band_upper_bounds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KITTI_SNIPPET: &str = r#"
labels:
  0: "unlabeled"
  1: "outlier"
  40: "road"
  48: "sidewalk"
color_map:
  0: [0, 0, 0]
  40: [255, 0, 255]
  48: [75, 0, 75]
learning_map:
  0: 0
  40: 9
split:
  train: [0, 1, 10]
  valid: [8]
  test: []
"#;

    #[test]
    fn test_parse_dataset_config() {
        let cfg: DatasetConfig = serde_yaml::from_str(KITTI_SNIPPET).unwrap();
        assert_eq!(cfg.labels.len(), 4);
        assert_eq!(cfg.labels[&48], "sidewalk");
        assert_eq!(cfg.color_map[&40], [255, 0, 255]);
        assert_eq!(cfg.sequences(Split::Train), vec!["00", "01", "10"]);
        assert_eq!(cfg.sequences(Split::Valid), vec!["08"]);
        assert!(cfg.sequences(Split::Test).is_empty());
        assert_eq!(cfg.class_name(999), "999");
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = DatasetConfig::load(Path::new("/nonexistent/semantic-kitti.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AnalysisConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.band_count(), 5);
        assert_eq!(cfg.max_anomalies, 1000);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let cfg: AnalysisConfig =
            serde_yaml::from_str("anomaly_threshold: 0.7\nmax_anomalies: 5\n").unwrap();
        assert_eq!(cfg.anomaly_threshold, 0.7);
        assert_eq!(cfg.max_anomalies, 5);
        assert_eq!(cfg.histogram_bins, 20);
        assert_eq!(cfg.weights, ScoreWeights::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = AnalysisConfig::default();
        cfg.band_upper_bounds = vec![10.0, 5.0];
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.weights.spatial = 0.9;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.histogram_bins = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.anomaly_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }
}
