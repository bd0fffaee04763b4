//! Order deduplication.
//!
//! Providers resend notifications, so the same business order id can show up
//! more than once. The policy is first occurrence wins: later duplicates are
//! discarded, never merged or overwritten. Ingestion processes messages in
//! provider order (newest first), so in practice the most recent
//! notification is the one kept.

use crate::core::order::Order;
use std::collections::HashSet;
use std::hash::Hash;

/// Keeps the first item for each key, preserving input order.
///
/// Returns the surviving items and the number discarded.
pub fn dedupe_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut discarded = 0;

    for item in items {
        if seen.insert(key(&item)) {
            kept.push(item);
        } else {
            discarded += 1;
        }
    }

    (kept, discarded)
}

/// Result of merging a fresh batch into the cached order history.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged history, newest first
    pub orders: Vec<Order>,
    /// Number of fresh orders that were new
    pub added: usize,
    /// Number of fresh orders dropped because their order id was already known
    pub discarded: usize,
}

/// Merges fresh orders into the cached history.
///
/// Cached orders take precedence: a fresh order whose `order_id` is already in
/// the history is dropped. The result is sorted newest first; orders with equal
/// timestamps keep their relative order.
#[must_use]
pub fn merge_orders(cached: Vec<Order>, fresh: Vec<Order>) -> MergeOutcome {
    let fresh_count = fresh.len();
    let cached_count = cached.len();

    let (mut orders, _) = dedupe_by(cached.into_iter().chain(fresh), |o| o.order_id.clone());
    let added = orders.len().saturating_sub(cached_count);
    orders.sort_by(|a, b| b.date.cmp(&a.date));

    MergeOutcome {
        orders,
        added,
        discarded: fresh_count.saturating_sub(added),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{order_on, ymd};

    #[test]
    fn test_dedupe_first_occurrence_wins() {
        let items = vec![("SH1", 1), ("SH2", 2), ("SH1", 3), ("SH3", 4), ("SH2", 5)];
        let (kept, discarded) = dedupe_by(items, |(id, _)| *id);

        assert_eq!(kept, vec![("SH1", 1), ("SH2", 2), ("SH3", 4)]);
        assert_eq!(discarded, 2);
    }

    #[test]
    fn test_dedupe_output_size_property() {
        // Groups: A x3, B x2, C x1 -> k = 2 duplicate groups
        let items = vec!["A", "B", "A", "C", "B", "A"];
        let input_len = items.len();
        let (kept, _) = dedupe_by(items, |s| *s);

        // input - (sum of duplicate group sizes - k) = 6 - (5 - 2) = 3
        assert_eq!(kept.len(), input_len - (5 - 2));
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let items = vec!["A", "B", "A", "C"];
        let (once, _) = dedupe_by(items, |s| *s);
        let (twice, discarded) = dedupe_by(once.clone(), |s| *s);

        assert_eq!(once, twice);
        assert_eq!(discarded, 0);
    }

    #[test]
    fn test_merge_keeps_cached_order_on_collision() {
        let cached = vec![order_on("SH1", 149.0, ymd(2024, 5, 1))];
        let mut resent = order_on("SH1", 999.0, ymd(2024, 6, 1));
        resent.id = "msg-resent".to_string();
        let fresh = vec![resent, order_on("SH2", 25.0, ymd(2024, 6, 2))];

        let outcome = merge_orders(cached, fresh);

        assert_eq!(outcome.orders.len(), 2);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.discarded, 1);
        let sh1 = outcome
            .orders
            .iter()
            .find(|o| o.order_id == "SH1")
            .map(|o| o.price);
        assert_eq!(sh1, Some(149.0));
    }

    #[test]
    fn test_merge_sorts_newest_first() {
        let cached = vec![order_on("OLD", 10.0, ymd(2024, 1, 1))];
        let fresh = vec![
            order_on("MID", 10.0, ymd(2024, 3, 1)),
            order_on("NEW", 10.0, ymd(2024, 6, 1)),
        ];

        let outcome = merge_orders(cached, fresh);
        let ids: Vec<&str> = outcome.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["NEW", "MID", "OLD"]);
    }

    #[test]
    fn test_merge_same_batch_twice_adds_nothing() {
        let batch = vec![
            order_on("SH1", 149.0, ymd(2024, 5, 1)),
            order_on("SH2", 25.0, ymd(2024, 5, 2)),
        ];

        let first = merge_orders(Vec::new(), batch.clone());
        let second = merge_orders(first.orders.clone(), batch);

        assert_eq!(second.orders, first.orders);
        assert_eq!(second.added, 0);
        assert_eq!(second.discarded, 2);
    }
}
