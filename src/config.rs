//! Engine configuration
//!
//! Every key has a default, so an empty document (or no file at all) yields
//! the standard forestry rules.

use std::path::Path;

use forestal_templates::BUILTIN_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Environment variable naming a YAML config file
pub const CONFIG_ENV_VAR: &str = "FORESTAL_CONFIG";

/// Largest rounding precision accepted for derived values
pub const MAX_DECIMALS: u32 = 10;

/// Tunables for derivation, validation and reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compared against the version the stored overlay was written under
    pub schema_version: String,
    /// Planting "Bandejas" multiplier
    pub plants_per_tray: u32,
    pub plantation_year_min: i32,
    pub plantation_year_max: i32,
    /// Weed-control product row cap
    pub max_product_rows: usize,
    /// Length of the hexadecimal opaque-identifier shape
    pub reference_id_length: usize,
    /// Characters kept in a truncated-identifier placeholder
    pub placeholder_prefix_len: usize,
    pub area_decimals: u32,
    pub time_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: BUILTIN_SCHEMA_VERSION.to_string(),
            plants_per_tray: 40,
            plantation_year_min: 1900,
            plantation_year_max: 2030,
            max_product_rows: 5,
            reference_id_length: 24,
            placeholder_prefix_len: 8,
            area_decimals: 4,
            time_decimals: 2,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            schema_version = %config.schema_version,
            "Loaded engine config"
        );
        Ok(config)
    }

    /// Load `.env`, then the file named by `FORESTAL_CONFIG` if set.
    /// Falls back to defaults when the variable is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => {
                debug!("{} not set, using default engine config", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    /// Reject settings no rule could work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version.trim().is_empty() {
            return Err(ConfigError::Invalid("schema_version is empty".into()));
        }
        if self.plantation_year_min > self.plantation_year_max {
            return Err(ConfigError::Invalid(format!(
                "plantation_year_min ({}) is after plantation_year_max ({})",
                self.plantation_year_min, self.plantation_year_max
            )));
        }
        if self.plants_per_tray == 0 {
            return Err(ConfigError::Invalid("plants_per_tray must be > 0".into()));
        }
        if self.max_product_rows == 0 {
            return Err(ConfigError::Invalid("max_product_rows must be > 0".into()));
        }
        if self.reference_id_length == 0 {
            return Err(ConfigError::Invalid("reference_id_length must be > 0".into()));
        }
        for (name, decimals) in [
            ("area_decimals", self.area_decimals),
            ("time_decimals", self.time_decimals),
        ] {
            if decimals > MAX_DECIMALS {
                return Err(ConfigError::Invalid(format!(
                    "{} ({}) must be at most {}",
                    name, decimals, MAX_DECIMALS
                )));
            }
        }
        Ok(())
    }

    /// Inclusive plantation-year check
    pub fn year_in_range(&self, year: f64) -> bool {
        year.fract() == 0.0
            && year >= f64::from(self.plantation_year_min)
            && year <= f64::from(self.plantation_year_max)
    }
}
