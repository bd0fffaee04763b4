//! `CommissionBuddy` - affiliate commission tracking from notification emails
//!
//! This crate turns affiliate "new referred order" notifications into order
//! records, identifies the product behind each order from its price, lets a
//! user resolve ambiguous orders by hand, and derives earnings analytics and
//! payout snapshots. The mailbox is the system of record; everything else is
//! rederived or cached behind a key-value store.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,

    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Correctness
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Style consistency
    clippy::enum_glob_use,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    future_incompatible,
    rust_2018_idioms,
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
)]

/// Configuration management for the tracker settings and database
pub mod config;
/// Core business logic - extraction, classification, review, analytics, payouts
pub mod core;
/// SeaORM entity definitions for database tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Key-value persistence boundary and its implementations
pub mod store;

#[cfg(test)]
pub mod test_utils;
