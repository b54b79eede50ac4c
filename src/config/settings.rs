//! Engine settings loaded from config.toml
//!
//! Every section is optional; a missing file or missing key falls back to the
//! defaults below, which reproduce the behaviour the engine is designed around.

use crate::core::distribution::{DEFAULT_TOLERANCE, DistributionMode, DistributionOptions};
use crate::core::recurring::MaterializeOptions;
use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Store settings
    pub database: DatabaseSettings,
    /// Recurring materializer settings
    pub recurring: RecurringSettings,
    /// Income distribution settings
    pub distribution: DistributionSettings,
}

/// `[database]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL; `DATABASE_URL` overrides it
    pub url: Option<String>,
}

/// `[recurring]` section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecurringSettings {
    /// Sync linked goals after each materialized occurrence
    pub sync_goals: bool,
}

impl Default for RecurringSettings {
    fn default() -> Self {
        Self { sync_goals: true }
    }
}

/// `[distribution]` section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    /// Allowed difference between the allocation sum and the total
    pub tolerance: Decimal,
    /// `best_effort` or `atomic`
    pub mode: DistributionMode,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            mode: DistributionMode::BestEffort,
        }
    }
}

impl EngineConfig {
    /// Options for [`crate::core::recurring::process_due`].
    #[must_use]
    pub const fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            sync_goals: self.recurring.sync_goals,
        }
    }

    /// Options for [`crate::core::distribution::distribute`].
    #[must_use]
    pub const fn distribution_options(&self) -> DistributionOptions {
        DistributionOptions {
            tolerance: self.distribution.tolerance,
            mode: self.distribution.mode,
        }
    }
}

/// Loads engine configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The tolerance is negative
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.distribution.tolerance.is_sign_negative() {
        return Err(Error::Config {
            message: "distribution.tolerance must not be negative".to_string(),
        });
    }

    Ok(config)
}

/// Loads configuration from ./config.toml, or defaults when the file is absent.
pub fn load_default_config() -> Result<EngineConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!("No config.toml found, using defaults");
        Ok(EngineConfig::default())
    }
}
