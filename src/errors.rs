//! Unified error types for the commission tracker.
//!
//! Per-message problems during ingestion (extraction misses, undecodable bodies,
//! bad timestamps) are recovered locally and never surface here. This enum covers
//! the failures a caller has to deal with: bad configuration, rejected user
//! actions, and whole-batch failures from the message source or the store.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// A monetary amount was negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A date interval whose start lies after its end
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Start of the interval as given
        start: String,
        /// End of the interval as given
        end: String,
    },

    /// No order with this business order id
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The order id that was looked up
        order_id: String,
    },

    /// The order was classified without ambiguity and has nothing to review
    #[error("Order {order_id} does not need review")]
    ReviewNotRequired {
        /// The order id
        order_id: String,
    },

    /// The review decision is already terminal and cannot be changed
    #[error("Review for order {order_id} is already {status}")]
    ReviewFinalized {
        /// The order id
        order_id: String,
        /// The terminal status the decision is in
        status: String,
    },

    /// The message source failed to deliver a batch (credentials, transport)
    #[error("Message source error: {message}")]
    Source {
        /// Description of the failure
        message: String,
    },

    /// User input that could not be parsed
    #[error("Parse error: {message}")]
    Parse {
        /// What could not be parsed
        message: String,
    },

    /// Storage backend failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization of stored collections
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export or import failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Extraction pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
