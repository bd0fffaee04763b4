//! Core business logic, independent of storage engine and presentation.

/// Earnings analytics: stats, monthly rollup, product mix, growth
pub mod analytics;
/// Price-point product classification
pub mod classify;
/// Order deduplication and history merging
pub mod dedup;
/// CSV export of the order view
pub mod export;
/// Order id and price extraction from message text
pub mod extract;
/// Ingestion pipeline and history refresh
pub mod ingest;
/// Raw message model and normalization
pub mod message;
/// Order records and the cached history
pub mod order;
/// Payout reconciliation
pub mod payout;
/// Plain-text report formatting
pub mod report;
/// Manual review ledger
pub mod review;
/// Message sources
pub mod source;
