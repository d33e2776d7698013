//! Run configuration for the segmentation pipeline.
//!
//! All parameters are fixed for the lifetime of a run; there is no mid-run
//! reconfiguration. Validation happens once at startup and is fatal: the
//! pipeline refuses to run on an invalid configuration rather than produce
//! silently-wrong output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Bird's-eye-view grid geometry.
///
/// The grid covers `[-range, range)` meters on both planar axes, split into
/// `width × height` cells. Cell size is derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BevGridConfig {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Half-extent of the grid in meters.
    pub range: f32,
}

impl Default for BevGridConfig {
    fn default() -> Self {
        // 120m x 120m coverage at ~19cm cells, sized for a 128-beam sensor
        Self {
            width: 640,
            height: 640,
            range: 60.0,
        }
    }
}

impl BevGridConfig {
    /// Cell extent along x (row direction) in meters.
    #[inline]
    pub fn cell_size_x(&self) -> f32 {
        2.0 * self.range / self.height as f32
    }

    /// Cell extent along y (column direction) in meters.
    #[inline]
    pub fn cell_size_y(&self) -> f32 {
        2.0 * self.range / self.width as f32
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Feature-channel toggles and encoding parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Include the top/mean intensity channels.
    pub use_intensity: bool,
    /// Include the precomputed direction/distance channels.
    pub use_constant: bool,
    /// Vertical lift in meters applied to height statistics during encoding.
    ///
    /// The paired model is trained with the cloud translated up by this
    /// amount so that ground returns sit above zero.
    pub z_offset: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            use_intensity: true,
            use_constant: true,
            z_offset: 2.0,
        }
    }
}

/// Clustering parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Minimum per-cell objectness for a cell to take part in clustering.
    ///
    /// Cells below this are excluded from clustering and from any object.
    pub objectness_threshold: f32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            objectness_threshold: 0.5,
        }
    }
}

/// Object acceptance thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Minimum aggregate objectness score.
    pub score_threshold: f32,
    /// Minimum vertical extent (max z - min z) in meters.
    pub height_threshold: f32,
    /// Minimum number of member points.
    pub min_points: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.8,
            height_threshold: 0.5,
            min_points: 3,
        }
    }
}

/// Full segmentation pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Grid geometry.
    pub grid: BevGridConfig,
    /// Feature encoding.
    pub features: FeatureConfig,
    /// Clustering.
    pub clustering: ClusteringConfig,
    /// Object acceptance.
    pub assembly: AssemblyConfig,
    /// Frame clouds must be transformed into before encoding.
    pub target_frame: String,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            grid: BevGridConfig::default(),
            features: FeatureConfig::default(),
            clustering: ClusteringConfig::default(),
            assembly: AssemblyConfig::default(),
            target_frame: "base_link".to_string(),
        }
    }
}

impl SegmentationConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Serialize to YAML string.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check all parameters. Any failure here must abort startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }
        if !(self.grid.range > 0.0) || !self.grid.range.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "grid range must be positive and finite, got {}",
                self.grid.range
            )));
        }
        if !(0.0..=1.0).contains(&self.clustering.objectness_threshold) {
            return Err(ConfigError::Invalid(format!(
                "objectness_threshold must be in [0, 1], got {}",
                self.clustering.objectness_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.assembly.score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "score_threshold must be in [0, 1], got {}",
                self.assembly.score_threshold
            )));
        }
        if !(self.assembly.height_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "height_threshold must be non-negative, got {}",
                self.assembly.height_threshold
            )));
        }
        if self.assembly.min_points == 0 {
            return Err(ConfigError::Invalid(
                "min_points must be at least 1".to_string(),
            ));
        }
        if !self.features.z_offset.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "z_offset must be finite, got {}",
                self.features.z_offset
            )));
        }
        if self.target_frame.is_empty() {
            return Err(ConfigError::Invalid("target_frame must be set".to_string()));
        }
        Ok(())
    }
}
