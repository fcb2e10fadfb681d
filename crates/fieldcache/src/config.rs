use crate::error::{FieldCacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of a field module and the caches it creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldModuleConfig {
    /// Time of the time-only location every new cache starts at
    pub initial_time: f64,

    /// New caches keep assigned values in the cache instead of writing
    /// them to field storage
    pub assign_in_cache_only: bool,

    /// Maximum depth of recursive source field evaluation
    pub max_evaluation_depth: usize,
}

impl Default for FieldModuleConfig {
    fn default() -> Self {
        Self {
            initial_time: 0.0,
            assign_in_cache_only: false,
            max_evaluation_depth: 256,
        }
    }
}

impl FieldModuleConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("Loaded field module config from {}", path.display());
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.initial_time.is_finite() {
            return Err(FieldCacheError::invalid_config(format!(
                "initial_time must be finite, got {}",
                self.initial_time
            )));
        }

        if self.max_evaluation_depth == 0 {
            return Err(FieldCacheError::invalid_config(
                "max_evaluation_depth must be > 0",
            ));
        }

        Ok(())
    }
}
