//! Payout reconciliation.
//!
//! A payout record snapshots which orders a real-world payment covers. Records
//! are immutable; a correction is a new record.

use crate::{
    core::order::Order,
    errors::{Error, Result},
    store::{self, KeyValueStore},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Store key for payout records
pub const PAYOUTS_KEY: &str = "payouts";

/// A payment received for orders in a date period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRecord {
    /// Unique record id
    pub id: String,
    /// Amount actually paid
    pub amount: f64,
    /// When the payout was recorded
    pub date: DateTime<Utc>,
    /// First day of the covered period
    pub period_start: NaiveDate,
    /// Last day of the covered period, inclusive
    pub period_end: NaiveDate,
    /// Orders dated inside the period at recording time
    pub order_ids: Vec<String>,
    /// Commission owed for those orders
    #[serde(default)]
    pub expected_commission: f64,
    /// Free-form notes
    pub notes: Option<String>,
}

impl PayoutRecord {
    /// Paid amount minus expected commission. Negative means underpaid.
    #[must_use]
    pub fn discrepancy(&self) -> f64 {
        self.amount - self.expected_commission
    }

    /// Whether the covered periods of two records share at least one day.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.period_start <= end && start <= self.period_end
    }
}

/// Builds a payout record for all orders dated inside `[start, end]`.
///
/// # Arguments
/// * `orders` - The order history
/// * `start` - First day of the period
/// * `end` - Last day of the period, inclusive
/// * `amount` - Amount received
/// * `notes` - Optional notes
/// * `now` - Recording time
///
/// # Errors
/// Returns `Error::InvalidAmount` for a negative or non-finite amount and
/// `Error::InvalidDateRange` if `start > end`.
pub fn reconcile_payout(
    orders: &[Order],
    start: NaiveDate,
    end: NaiveDate,
    amount: f64,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<PayoutRecord> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    if start > end {
        return Err(Error::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let covered: Vec<&Order> = orders
        .iter()
        .filter(|o| {
            let day = o.date.date_naive();
            day >= start && day <= end
        })
        .collect();

    Ok(PayoutRecord {
        id: Uuid::new_v4().to_string(),
        amount,
        date: now,
        period_start: start,
        period_end: end,
        order_ids: covered.iter().map(|o| o.order_id.clone()).collect(),
        expected_commission: covered.iter().map(|o| o.commission).sum(),
        notes,
    })
}

/// Existing records whose periods overlap `[start, end]`.
#[must_use]
pub fn overlapping_payouts(
    payouts: &[PayoutRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&PayoutRecord> {
    payouts.iter().filter(|p| p.overlaps(start, end)).collect()
}

/// Loads all payout records, oldest first.
pub async fn load_payouts<S: KeyValueStore>(store: &S) -> Result<Vec<PayoutRecord>> {
    let payouts: Option<Vec<PayoutRecord>> = store::load_json(store, PAYOUTS_KEY).await?;
    Ok(payouts.unwrap_or_default())
}

/// Appends a payout record to the stored list.
///
/// Overlap with earlier records is allowed and logged.
pub async fn record_payout<S: KeyValueStore>(store: &S, record: PayoutRecord) -> Result<()> {
    let mut payouts = load_payouts(store).await?;

    for existing in overlapping_payouts(&payouts, record.period_start, record.period_end) {
        warn!(
            "Payout {} overlaps earlier payout {} ({} to {})",
            record.id, existing.id, existing.period_start, existing.period_end
        );
    }

    info!(
        "Recording payout {} of ${:.2} for {} orders ({} to {})",
        record.id,
        record.amount,
        record.order_ids.len(),
        record.period_start,
        record.period_end
    );
    payouts.push(record);
    store::save_json(store, PAYOUTS_KEY, &payouts).await
}
