/// Database configuration and connection management
pub mod database;

/// Tracker settings (catalog, thresholds, patterns) loaded from config.toml
pub mod tracker;

pub use tracker::{ExtractionConfig, TrackerConfig};
