//! Order records and the cached order history.
//!
//! An order is created once per successful extraction and is not mutated
//! afterwards; review outcomes live in the review ledger instead. The whole
//! order history is cached as one document in the key-value store.

use crate::{
    core::classify::Classification,
    errors::{Error, Result},
    store::{self, KeyValueStore},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Store key for the cached order history
pub const ORDERS_KEY: &str = "orders";

/// One referred order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Source message identifier
    pub id: String,
    /// Business order code from the notification text
    pub order_id: String,
    /// Order value
    pub price: f64,
    /// Commission earned, fixed at extraction time
    pub commission: f64,
    /// Notification timestamp
    pub date: DateTime<Utc>,
    /// Product type from classification
    pub product: String,
    /// Product display name from classification
    pub product_name: String,
    /// True when classification could not identify the product
    pub needs_review: bool,
}

impl Order {
    /// Builds an order from an extracted candidate and its classification.
    #[must_use]
    pub fn new(
        message_id: String,
        order_id: String,
        price: f64,
        commission_rate: f64,
        date: DateTime<Utc>,
        classification: Classification,
    ) -> Self {
        Self {
            id: message_id,
            order_id,
            price,
            commission: price * commission_rate,
            date,
            product: classification.product_type,
            product_name: classification.product_name,
            needs_review: classification.needs_review,
        }
    }

    /// Replaces the classification outputs, leaving price and commission alone.
    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.product = classification.product_type;
        self.product_name = classification.product_name;
        self.needs_review = classification.needs_review;
        self
    }
}

/// Finds an order by its business order id.
///
/// # Errors
/// Returns `Error::OrderNotFound` if no order has that id.
pub fn find_order<'a>(orders: &'a [Order], order_id: &str) -> Result<&'a Order> {
    orders
        .iter()
        .find(|o| o.order_id == order_id)
        .ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })
}

/// The cached order history with the time of the last successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCache {
    /// Orders, newest first
    pub orders: Vec<Order>,
    /// When the cache was last refreshed
    pub last_updated: Option<DateTime<Utc>>,
}

/// Loads the cached order history, or an empty one if nothing is stored.
pub async fn load_cached_orders<S: KeyValueStore>(store: &S) -> Result<OrderCache> {
    let cache: Option<OrderCache> = store::load_json(store, ORDERS_KEY).await?;
    let cache = cache.unwrap_or_default();
    debug!("Loaded {} cached orders", cache.orders.len());
    Ok(cache)
}

/// Replaces the cached order history.
pub async fn save_cached_orders<S: KeyValueStore>(store: &S, cache: &OrderCache) -> Result<()> {
    store::save_json(store, ORDERS_KEY, cache).await?;
    debug!("Saved {} cached orders", cache.orders.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::classify::classify;
    use crate::store::MemoryStore;
    use crate::test_utils::{order_on, sample_catalog, ymd};

    #[test]
    fn test_new_order_computes_commission() {
        let classification = classify(200.0, &sample_catalog(), 100.0);
        let order = Order::new(
            "msg-1".to_string(),
            "SH1".to_string(),
            200.0,
            0.15,
            ymd(2024, 6, 1),
            classification,
        );

        assert_eq!(order.commission, 30.0);
        assert_eq!(order.product, "unknown");
        assert!(order.needs_review);
    }

    #[test]
    fn test_with_classification_keeps_commission() {
        let order = order_on("SH1", 149.0, ymd(2024, 6, 1));
        let commission = order.commission;
        let reclassified = order.with_classification(Classification {
            product_type: "other".to_string(),
            product_name: "Other".to_string(),
            needs_review: false,
        });

        assert_eq!(reclassified.product, "other");
        assert_eq!(reclassified.commission, commission);
    }

    #[test]
    fn test_find_order() {
        let orders = vec![order_on("SH1", 149.0, ymd(2024, 6, 1))];
        assert_eq!(find_order(&orders, "SH1").unwrap().price, 149.0);
        assert!(matches!(
            find_order(&orders, "SH404").unwrap_err(),
            Error::OrderNotFound { order_id: _ }
        ));
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let order = order_on("SH1", 149.0, ymd(2024, 6, 1));
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"orderId\":\"SH1\""));
        assert!(json.contains("\"needsReview\":false"));
    }

    #[tokio::test]
    async fn test_order_cache_roundtrip() -> Result<()> {
        let store = MemoryStore::new();

        let empty = load_cached_orders(&store).await?;
        assert!(empty.orders.is_empty());
        assert!(empty.last_updated.is_none());

        let cache = OrderCache {
            orders: vec![order_on("SH1", 149.0, ymd(2024, 6, 1))],
            last_updated: Some(ymd(2024, 6, 2)),
        };
        save_cached_orders(&store, &cache).await?;

        assert_eq!(load_cached_orders(&store).await?, cache);
        Ok(())
    }
}
