//! Tracker configuration loading from config.toml
//!
//! The configuration carries the product catalog used for price-point
//! classification, the accessory threshold, the commission rate applied at
//! extraction time, and optional overrides for the extraction patterns.

use crate::core::classify::CatalogEntry;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Default commission paid on each referred order
pub const DEFAULT_COMMISSION_RATE: f64 = 0.15;

/// Default price below which unmatched orders count as accessories
pub const DEFAULT_ACCESSORY_THRESHOLD: f64 = 100.0;

/// Matches "There is a new referred order with ID: SH43589 ..."
pub const DEFAULT_ORDER_ID_PATTERN: &str = r"(?i)order with ID:\s*([A-Z0-9]+)";

/// Matches "... and price $1,329.99"
pub const DEFAULT_PRICE_PATTERN: &str = r"(?i)price\s*\$?([\d,]+\.?\d*)";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Fraction of the order price paid out as commission
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// Unmatched orders priced strictly between zero and this value are accessories
    #[serde(default = "default_accessory_threshold")]
    pub accessory_threshold: f64,
    /// Catalog entries, in match priority order
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    /// Extraction pattern overrides
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Regex patterns used to pull an order out of notification text.
///
/// Each pattern must have one capture group holding the value.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Pattern anchored on the order identifier marker
    #[serde(default = "default_order_id_pattern")]
    pub order_id_pattern: String,
    /// Pattern anchored on the currency-prefixed amount
    #[serde(default = "default_price_pattern")]
    pub price_pattern: String,
}

fn default_commission_rate() -> f64 {
    DEFAULT_COMMISSION_RATE
}

fn default_accessory_threshold() -> f64 {
    DEFAULT_ACCESSORY_THRESHOLD
}

fn default_order_id_pattern() -> String {
    DEFAULT_ORDER_ID_PATTERN.to_string()
}

fn default_price_pattern() -> String {
    DEFAULT_PRICE_PATTERN.to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            order_id_pattern: default_order_id_pattern(),
            price_pattern: default_price_pattern(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            accessory_threshold: DEFAULT_ACCESSORY_THRESHOLD,
            catalog: Vec::new(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Checks that the numeric settings and catalog entries make sense.
    ///
    /// # Errors
    /// Returns `Error::Config` if:
    /// - The commission rate is outside `[0, 1]` or not finite
    /// - The accessory threshold is negative or not finite
    /// - A catalog entry has an empty product type, or a negative or
    ///   non-finite price point or tolerance
    pub fn validate(&self) -> Result<()> {
        if !self.commission_rate.is_finite() || !(0.0..=1.0).contains(&self.commission_rate) {
            return Err(Error::Config {
                message: format!(
                    "commission_rate must be between 0 and 1, got {}",
                    self.commission_rate
                ),
            });
        }

        if !self.accessory_threshold.is_finite() || self.accessory_threshold < 0.0 {
            return Err(Error::Config {
                message: format!(
                    "accessory_threshold must be a non-negative number, got {}",
                    self.accessory_threshold
                ),
            });
        }

        for entry in &self.catalog {
            if entry.product_type.trim().is_empty() {
                return Err(Error::Config {
                    message: "catalog entry product_type cannot be empty".to_string(),
                });
            }
            if !entry.price_point.is_finite() || entry.price_point < 0.0 {
                return Err(Error::Config {
                    message: format!(
                        "catalog entry '{}' has invalid price_point {}",
                        entry.product_type, entry.price_point
                    ),
                });
            }
            if !entry.tolerance.is_finite() || entry.tolerance < 0.0 {
                return Err(Error::Config {
                    message: format!(
                        "catalog entry '{}' has invalid tolerance {}",
                        entry.product_type, entry.tolerance
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Parses and validates a configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid, a field has the wrong type,
/// or [`TrackerConfig::validate`] rejects the values.
pub fn parse_config(contents: &str) -> Result<TrackerConfig> {
    let config: TrackerConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads the tracker configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if the file cannot be read or fails to parse or validate.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackerConfig> {
    let path_ref = path.as_ref();
    debug!("Loading tracker configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads the configuration from `COMMISSION_CONFIG`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<TrackerConfig> {
    let path =
        std::env::var("COMMISSION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}
