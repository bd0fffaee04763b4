//! Manual review of ambiguous orders.
//!
//! Orders the classifier could not identify are flagged `needs_review`. A user
//! resolves them here, and the outcome is recorded in a ledger keyed by order
//! id instead of on the order itself.
//!
//! ```text
//! pending ──approve──▶ approved
//!    └─────dismiss──▶ dismissed
//! ```
//!
//! A missing entry means pending. Approved and dismissed are terminal; an
//! order that was classified cleanly never enters the workflow.

use crate::{
    core::{
        classify::{CatalogEntry, display_name_for},
        order::Order,
    },
    errors::{Error, Result},
    store::{self, KeyValueStore},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, btree_map::Entry};
use std::fmt;
use tracing::{debug, info};

/// Store key for the review ledger
pub const REVIEW_DECISIONS_KEY: &str = "review_decisions";

/// Where an order is in the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Waiting for a decision
    Pending,
    /// A product was assigned by hand
    Approved,
    /// Marked as not needing attention
    Dismissed,
}

impl ReviewStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Dismissed)
    }

    /// Lowercase name used in messages and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product assigned to an order during review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedProduct {
    /// Product type
    pub product_type: String,
    /// Display name
    pub product_name: String,
}

impl AssignedProduct {
    /// Builds an assignment for `product_type`, taking the display name from
    /// the catalog when the type is known there.
    #[must_use]
    pub fn from_catalog(product_type: &str, catalog: &[CatalogEntry]) -> Self {
        Self {
            product_type: product_type.to_string(),
            product_name: display_name_for(product_type, catalog).to_string(),
        }
    }
}

/// The review outcome for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    /// Business order id
    pub order_id: String,
    /// Current status
    pub status: ReviewStatus,
    /// Assigned product, set on approval
    pub assigned_product: Option<AssignedProduct>,
    /// Free-form reviewer notes
    pub notes: Option<String>,
    /// When the decision was made, unset while pending
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Review state of an order as shown in listings and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Classified without ambiguity
    Classified,
    /// Flagged and not yet resolved
    NeedsReview,
    /// Resolved with a product assignment
    Approved,
    /// Resolved by dismissal
    Dismissed,
}

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Classified => "Classified",
            Self::NeedsReview => "Needs Review",
            Self::Approved => "Approved",
            Self::Dismissed => "Dismissed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// All review decisions, keyed by order id. One decision per order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewLedger {
    decisions: BTreeMap<String, ReviewDecision>,
}

impl ReviewLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The decision recorded for an order, if any.
    #[must_use]
    pub fn get(&self, order_id: &str) -> Option<&ReviewDecision> {
        self.decisions.get(order_id)
    }

    /// Status of an order's review; absence of an entry means pending.
    #[must_use]
    pub fn status_of(&self, order_id: &str) -> ReviewStatus {
        self.get(order_id).map_or(ReviewStatus::Pending, |d| d.status)
    }

    /// Number of recorded decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Whether no decisions are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// All decisions in order id order.
    pub fn decisions(&self) -> impl Iterator<Item = &ReviewDecision> {
        self.decisions.values()
    }

    /// Opens a flagged order for review, creating a pending entry if needed.
    ///
    /// Opening an order that already has a decision returns it unchanged.
    ///
    /// # Errors
    /// Returns `Error::ReviewNotRequired` if the order is not flagged.
    pub fn open(&mut self, order: &Order) -> Result<&ReviewDecision> {
        ensure_reviewable(order)?;
        Ok(self
            .decisions
            .entry(order.order_id.clone())
            .or_insert_with(|| ReviewDecision {
                order_id: order.order_id.clone(),
                status: ReviewStatus::Pending,
                assigned_product: None,
                notes: None,
                reviewed_at: None,
            }))
    }

    /// Approves a flagged order with a product assignment.
    ///
    /// # Errors
    /// Returns `Error::ReviewNotRequired` if the order is not flagged, or
    /// `Error::ReviewFinalized` if it was already approved or dismissed.
    pub fn approve(
        &mut self,
        order: &Order,
        product: AssignedProduct,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&ReviewDecision> {
        self.finalize(order, ReviewStatus::Approved, Some(product), notes, now)
    }

    /// Dismisses a flagged order without assigning a product.
    ///
    /// # Errors
    /// Returns `Error::ReviewNotRequired` if the order is not flagged, or
    /// `Error::ReviewFinalized` if it was already approved or dismissed.
    pub fn dismiss(
        &mut self,
        order: &Order,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&ReviewDecision> {
        self.finalize(order, ReviewStatus::Dismissed, None, notes, now)
    }

    fn finalize(
        &mut self,
        order: &Order,
        status: ReviewStatus,
        assigned_product: Option<AssignedProduct>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&ReviewDecision> {
        ensure_reviewable(order)?;

        let current = self.status_of(&order.order_id);
        if current.is_terminal() {
            return Err(Error::ReviewFinalized {
                order_id: order.order_id.clone(),
                status: current.to_string(),
            });
        }

        info!("Review for order {} set to {}", order.order_id, status);
        let decision = ReviewDecision {
            order_id: order.order_id.clone(),
            status,
            assigned_product,
            notes,
            reviewed_at: Some(now),
        };

        let slot = match self.decisions.entry(order.order_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(decision);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(decision),
        };
        Ok(slot)
    }

    /// Orders that still need attention: flagged and not yet resolved.
    #[must_use]
    pub fn pending_orders<'a>(&self, orders: &'a [Order]) -> Vec<&'a Order> {
        orders
            .iter()
            .filter(|o| o.needs_review && !self.status_of(&o.order_id).is_terminal())
            .collect()
    }

    /// Product type and name to report for an order: the approved assignment
    /// if there is one, otherwise the stored classification.
    #[must_use]
    pub fn effective_product<'a>(&'a self, order: &'a Order) -> (&'a str, &'a str) {
        if order.needs_review {
            if let Some(ReviewDecision {
                status: ReviewStatus::Approved,
                assigned_product: Some(product),
                ..
            }) = self.get(&order.order_id)
            {
                return (product.product_type.as_str(), product.product_name.as_str());
            }
        }
        (order.product.as_str(), order.product_name.as_str())
    }

    /// Review state of an order for display.
    #[must_use]
    pub fn order_status(&self, order: &Order) -> OrderStatus {
        if !order.needs_review {
            return OrderStatus::Classified;
        }
        match self.status_of(&order.order_id) {
            ReviewStatus::Pending => OrderStatus::NeedsReview,
            ReviewStatus::Approved => OrderStatus::Approved,
            ReviewStatus::Dismissed => OrderStatus::Dismissed,
        }
    }
}

fn ensure_reviewable(order: &Order) -> Result<()> {
    if order.needs_review {
        Ok(())
    } else {
        Err(Error::ReviewNotRequired {
            order_id: order.order_id.clone(),
        })
    }
}

/// Loads the review ledger, or an empty one if nothing is stored.
pub async fn load_review_ledger<S: KeyValueStore>(store: &S) -> Result<ReviewLedger> {
    let ledger: Option<ReviewLedger> = store::load_json(store, REVIEW_DECISIONS_KEY).await?;
    let ledger = ledger.unwrap_or_default();
    debug!("Loaded {} review decisions", ledger.len());
    Ok(ledger)
}

/// Saves the review ledger, replacing what was stored.
pub async fn save_review_ledger<S: KeyValueStore>(store: &S, ledger: &ReviewLedger) -> Result<()> {
    store::save_json(store, REVIEW_DECISIONS_KEY, ledger).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::{order_on, sample_catalog, setup_test_store, ymd};

    fn flagged() -> Order {
        order_on("SH500", 500.0, ymd(2024, 6, 1))
    }

    fn clean() -> Order {
        order_on("SH149", 149.0, ymd(2024, 6, 1))
    }

    #[test]
    fn test_missing_entry_is_pending() {
        let ledger = ReviewLedger::new();
        assert_eq!(ledger.status_of("anything"), ReviewStatus::Pending);
    }

    #[test]
    fn test_open_creates_pending_entry() {
        let mut ledger = ReviewLedger::new();
        let decision = ledger.open(&flagged()).unwrap();
        assert_eq!(decision.status, ReviewStatus::Pending);
        assert!(decision.reviewed_at.is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_approve_records_assignment() {
        let mut ledger = ReviewLedger::new();
        let order = flagged();
        let product = AssignedProduct::from_catalog("goldie", &sample_catalog());

        let decision = ledger
            .approve(&order, product, Some("bundle of two".to_string()), ymd(2024, 6, 2))
            .unwrap();
        assert_eq!(decision.status, ReviewStatus::Approved);
        assert_eq!(decision.reviewed_at, Some(ymd(2024, 6, 2)));

        assert_eq!(ledger.effective_product(&order), ("goldie", "Goldie"));
        assert_eq!(ledger.order_status(&order), OrderStatus::Approved);
    }

    #[test]
    fn test_dismiss_keeps_stored_classification() {
        let mut ledger = ReviewLedger::new();
        let order = flagged();
        ledger.open(&order).unwrap();
        ledger.dismiss(&order, None, ymd(2024, 6, 2)).unwrap();

        assert_eq!(ledger.status_of("SH500"), ReviewStatus::Dismissed);
        assert_eq!(ledger.effective_product(&order), ("unknown", "Unknown"));
        assert!(ledger.pending_orders(&[order]).is_empty());
    }

    #[test]
    fn test_terminal_states_cannot_change() {
        let mut ledger = ReviewLedger::new();
        let order = flagged();
        ledger.dismiss(&order, None, ymd(2024, 6, 2)).unwrap();

        let err = ledger
            .approve(
                &order,
                AssignedProduct::from_catalog("goldie", &sample_catalog()),
                None,
                ymd(2024, 6, 3),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ReviewFinalized { .. }));

        let err = ledger.dismiss(&order, None, ymd(2024, 6, 3)).unwrap_err();
        assert!(matches!(err, Error::ReviewFinalized { .. }));

        // Opening a finalized order only views it
        assert_eq!(ledger.open(&order).unwrap().status, ReviewStatus::Dismissed);
    }

    #[test]
    fn test_clean_orders_never_enter_review() {
        let mut ledger = ReviewLedger::new();
        let order = clean();

        assert!(matches!(
            ledger.open(&order).unwrap_err(),
            Error::ReviewNotRequired { order_id: _ }
        ));
        assert!(ledger.dismiss(&order, None, ymd(2024, 6, 2)).is_err());
        assert!(ledger.pending_orders(&[order.clone()]).is_empty());
        assert_eq!(ledger.order_status(&order), OrderStatus::Classified);
    }

    #[test]
    fn test_pending_orders_lists_unresolved_flagged_orders() {
        let mut ledger = ReviewLedger::new();
        let orders = vec![
            flagged(),
            clean(),
            order_on("SH999", 999.0, ymd(2024, 6, 3)),
        ];
        ledger.open(&orders[0]).unwrap();
        ledger.dismiss(&orders[2], None, ymd(2024, 6, 4)).unwrap();

        let pending: Vec<&str> = ledger
            .pending_orders(&orders)
            .iter()
            .map(|o| o.order_id.as_str())
            .collect();
        assert_eq!(pending, vec!["SH500"]);
    }

    #[tokio::test]
    async fn test_ledger_persistence_roundtrip() -> Result<()> {
        let store = MemoryStore::new();
        assert!(load_review_ledger(&store).await?.is_empty());

        let mut ledger = ReviewLedger::new();
        ledger.approve(
            &flagged(),
            AssignedProduct::from_catalog("starter_bundle", &sample_catalog()),
            None,
            ymd(2024, 6, 2),
        )?;
        save_review_ledger(&store, &ledger).await?;

        let loaded = load_review_ledger(&store).await?;
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.status_of("SH500"), ReviewStatus::Approved);
        Ok(())
    }

    #[tokio::test]
    async fn test_opened_order_stays_pending_across_sessions() -> Result<()> {
        let store = setup_test_store().await?;
        let order = flagged();

        let mut ledger = load_review_ledger(&store).await?;
        assert_eq!(ledger.open(&order)?.status, ReviewStatus::Pending);
        save_review_ledger(&store, &ledger).await?;

        let mut reloaded = load_review_ledger(&store).await?;
        let decision = reloaded.get("SH500").unwrap();
        assert_eq!(decision.status, ReviewStatus::Pending);
        assert!(decision.reviewed_at.is_none());
        assert_eq!(reloaded.order_status(&order), OrderStatus::NeedsReview);
        assert_eq!(reloaded.pending_orders(std::slice::from_ref(&order)).len(), 1);

        reloaded.dismiss(&order, Some("duplicate charge".to_string()), ymd(2024, 6, 3))?;
        assert_eq!(reloaded.status_of("SH500"), ReviewStatus::Dismissed);
        Ok(())
    }
}
