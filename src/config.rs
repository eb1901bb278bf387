//! Render configuration
//!
//! Loaded from TOML, validated before any device object is created.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterTreeConfig;
use crate::sort::{SortOrder, MAX_BUCKET_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Per-frame rendering knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Buckets in the depth sort
    pub bucket_count: usize,
    /// Tree level sorted every frame
    pub sort_level: u32,
    pub order: SortOrder,
    pub cluster: ClusterTreeConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1024,
            sort_level: 3,
            order: SortOrder::BackToFront,
            cluster: ClusterTreeConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bucket_count == 0 {
            return Err(invalid("bucket_count", self.bucket_count, "cannot be 0"));
        }

        if self.bucket_count > MAX_BUCKET_COUNT {
            return Err(invalid(
                "bucket_count",
                self.bucket_count,
                format!("exceeds maximum of {}", MAX_BUCKET_COUNT),
            ));
        }

        if self.sort_level > self.cluster.max_depth {
            return Err(invalid(
                "sort_level",
                self.sort_level,
                format!("deeper than cluster.max_depth {}", self.cluster.max_depth),
            ));
        }

        if self.cluster.min_cluster_size == 0 {
            return Err(invalid("cluster.min_cluster_size", 0, "cannot be 0"));
        }

        for (field, value) in [
            ("cluster.min_distance", self.cluster.min_distance),
            ("cluster.distance_scale", self.cluster.distance_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value, "must be finite and non-negative"));
            }
        }

        log::info!(
            "[RenderConfig] Configuration validated: {} buckets, level {}, {:?}",
            self.bucket_count,
            self.sort_level,
            self.order
        );
        Ok(())
    }

    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("[RenderConfig::load] Loading {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            field: "config",
            value: String::new(),
            reason: e.to_string(),
        })
    }
}

fn invalid(field: &'static str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}
