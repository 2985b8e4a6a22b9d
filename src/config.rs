use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PoseError, PoseResult};
use crate::pose_vector::DEFAULT_MAX_AGE_SECS;

/// Longest accepted retention horizon: 100 years
pub const MAX_AGE_LIMIT_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Settings shared by every pose vector in a tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseTreeConfig {
    /// Retention horizon in seconds (default 3600)
    pub max_age_secs: i64,
}

impl Default for PoseTreeConfig {
    fn default() -> Self {
        PoseTreeConfig {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl PoseTreeConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> PoseResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PoseError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> PoseResult<Self> {
        let config: PoseTreeConfig =
            serde_json::from_str(content).map_err(|e| PoseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PoseResult<()> {
        if self.max_age_secs <= 0 {
            return Err(PoseError::Config(format!(
                "max_age_secs must be positive, got {}",
                self.max_age_secs
            )));
        }
        if self.max_age_secs > MAX_AGE_LIMIT_SECS {
            return Err(PoseError::Config(format!(
                "max_age_secs must be at most {}, got {}",
                MAX_AGE_LIMIT_SECS, self.max_age_secs
            )));
        }
        Ok(())
    }

    /// Retention horizon, clamped to the accepted range for unvalidated configs
    pub fn max_age(&self) -> Duration {
        Duration::seconds(self.max_age_secs.clamp(1, MAX_AGE_LIMIT_SECS))
    }
}
