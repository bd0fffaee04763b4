//! Ingestion pipeline.
//!
//! One batch runs sequentially: normalize, extract, dedupe, classify. Failures
//! for a single message are logged and the message is left out; they never
//! abort the batch. Only a failing message source or store surfaces as an
//! error, and in that case the cached orders are left as they were.

use crate::{
    config::TrackerConfig,
    core::{
        classify::classify,
        dedup::{dedupe_by, merge_orders},
        extract::{ExtractedOrder, OrderExtractor},
        message::{RawMessage, normalize},
        order::{Order, OrderCache, load_cached_orders, save_cached_orders},
        source::MessageSource,
    },
    errors::Result,
    store::KeyValueStore,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// A message left out of the batch because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMessage {
    /// Provider message identifier
    pub message_id: String,
    /// Why the message was skipped
    pub reason: String,
}

/// Outcome of ingesting one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Orders, one per distinct order id, in provider order
    pub orders: Vec<Order>,
    /// Messages that failed to normalize
    pub skipped: Vec<SkippedMessage>,
    /// Messages that normalized but matched no order pattern
    pub not_orders: usize,
    /// Candidates discarded as duplicate order ids
    pub duplicates: usize,
    /// Orders whose timestamp fell back to the ingestion time
    pub fallback_timestamps: usize,
}

struct Candidate {
    message_id: String,
    date: DateTime<Utc>,
    extracted: ExtractedOrder,
}

/// Runs one batch through the pipeline.
///
/// # Arguments
/// * `messages` - Raw messages in provider order (newest first)
/// * `extractor` - Compiled extraction patterns
/// * `config` - Catalog, accessory threshold, and commission rate
/// * `now` - Fallback timestamp for messages without a usable `Date` header
#[must_use]
pub fn ingest_batch(
    messages: &[RawMessage],
    extractor: &OrderExtractor,
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> IngestReport {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    let mut not_orders = 0;
    let mut fallback_timestamps = 0;

    for raw in messages {
        let normalized = match normalize(raw, now) {
            Ok(n) => n,
            Err(e) => {
                warn!("Skipping message {}: {}", raw.id, e);
                skipped.push(SkippedMessage {
                    message_id: raw.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let Some(extracted) = extractor.extract(&normalized.text) else {
            debug!("Message {} is not an order notification", raw.id);
            not_orders += 1;
            continue;
        };

        if normalized.timestamp_fallback {
            fallback_timestamps += 1;
        }

        candidates.push(Candidate {
            message_id: normalized.id,
            date: normalized.timestamp,
            extracted,
        });
    }

    let (unique, duplicates) = dedupe_by(candidates, |c| c.extracted.order_id.clone());
    if duplicates > 0 {
        debug!("Discarded {} duplicate order notifications", duplicates);
    }

    let orders = unique
        .into_iter()
        .map(|c| {
            let classification =
                classify(c.extracted.price, &config.catalog, config.accessory_threshold);
            Order::new(
                c.message_id,
                c.extracted.order_id,
                c.extracted.price,
                config.commission_rate,
                c.date,
                classification,
            )
        })
        .collect();

    IngestReport {
        orders,
        skipped,
        not_orders,
        duplicates,
        fallback_timestamps,
    }
}

/// Re-runs classification over stored orders with the current catalog.
///
/// Commission is left as it was computed at extraction time.
#[must_use]
pub fn reclassify(orders: Vec<Order>, config: &TrackerConfig) -> Vec<Order> {
    orders
        .into_iter()
        .map(|order| {
            let classification = classify(order.price, &config.catalog, config.accessory_threshold);
            order.with_classification(classification)
        })
        .collect()
}

/// Summary of one refresh of the cached order history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Messages delivered by the source
    pub fetched: usize,
    /// Orders extracted from the batch after deduplication
    pub extracted: usize,
    /// Orders that were not in the history before
    pub added: usize,
    /// Messages skipped as unreadable
    pub skipped: usize,
    /// Size of the history after the refresh
    pub total: usize,
}

/// Fetches a batch, ingests it, and merges the result into the cached history.
///
/// # Errors
/// Returns the source error unchanged if the batch cannot be fetched, or a
/// store error if the history cannot be read or written. Either way the
/// previously cached orders are not modified.
pub async fn refresh<M, S>(
    source: &M,
    store: &S,
    extractor: &OrderExtractor,
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> Result<RefreshSummary>
where
    M: MessageSource,
    S: KeyValueStore,
{
    let messages = source
        .fetch_messages()
        .await
        .inspect_err(|e| error!("Failed to fetch messages: {}", e))?;

    let report = ingest_batch(&messages, extractor, config, now);
    let extracted = report.orders.len();
    let skipped = report.skipped.len();

    let cache = load_cached_orders(store).await?;
    let merged = merge_orders(cache.orders, report.orders);

    let summary = RefreshSummary {
        fetched: messages.len(),
        extracted,
        added: merged.added,
        skipped,
        total: merged.orders.len(),
    };

    save_cached_orders(
        store,
        &OrderCache {
            orders: merged.orders,
            last_updated: Some(now),
        },
    )
    .await?;

    info!(
        "Refresh complete: {} messages, {} orders extracted, {} new, {} total",
        summary.fetched, summary.extracted, summary.added, summary.total
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        message::{BodyData, BodyEncoding, MessageBody},
        source::StaticSource,
    };
    use crate::errors::Error;
    use crate::store::MemoryStore;
    use crate::test_utils::{init_test_tracing, plain_message, sample_config, ymd};

    fn extractor() -> OrderExtractor {
        OrderExtractor::new(&sample_config().extraction).unwrap()
    }

    struct FailingSource;

    impl MessageSource for FailingSource {
        async fn fetch_messages(&self) -> Result<Vec<RawMessage>> {
            Err(Error::Source {
                message: "credentials rejected".to_string(),
            })
        }
    }

    #[test]
    fn test_duplicate_scenario() {
        let messages = vec![
            plain_message(
                "m1",
                "There is a new referred order with ID: SH1 and price $149.00",
                Some("Sat, 1 Jun 2024 10:00:00 +0000"),
            ),
            plain_message(
                "m2",
                "There is a new referred order with ID: SH1 and price $149.00",
                Some("Sat, 1 Jun 2024 09:00:00 +0000"),
            ),
            plain_message(
                "m3",
                "There is a new referred order with ID: SH2 and price $500.00",
                Some("Wed, 1 May 2024 10:00:00 +0000"),
            ),
        ];

        let report = ingest_batch(&messages, &extractor(), &sample_config(), ymd(2024, 6, 15));

        assert_eq!(report.orders.len(), 2);
        assert_eq!(report.duplicates, 1);

        let sh1 = &report.orders[0];
        assert_eq!(sh1.order_id, "SH1");
        assert_eq!(sh1.id, "m1");
        assert_eq!(sh1.product, "goldie");
        assert!(!sh1.needs_review);

        let sh2 = &report.orders[1];
        assert_eq!(sh2.order_id, "SH2");
        assert_eq!(sh2.product, "unknown");
        assert!(sh2.needs_review);
        assert_eq!(sh2.commission, 75.0);
    }

    #[test]
    fn test_bad_messages_do_not_abort_batch() {
        let mut undecodable = plain_message("bad", "", None);
        undecodable.body = MessageBody::Single(BodyData {
            encoding: BodyEncoding::Base64,
            data: "%%%".to_string(),
        });

        let messages = vec![
            undecodable,
            plain_message("newsletter", "Weekly affiliate newsletter", None),
            plain_message("ok", "order with ID: SH7 and price $25", None),
        ];

        let now = ymd(2024, 6, 15);
        let report = ingest_batch(&messages, &extractor(), &sample_config(), now);

        assert_eq!(report.orders.len(), 1);
        assert_eq!(report.orders[0].product, "accessory");
        assert_eq!(report.orders[0].date, now);
        assert_eq!(report.fallback_timestamps, 1);
        assert_eq!(report.not_orders, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].message_id, "bad");
    }

    #[test]
    fn test_ingest_twice_yields_same_orders() {
        let messages = vec![
            plain_message("m1", "order with ID: A1 price $149", None),
            plain_message("m2", "order with ID: A2 price $329.99", None),
            plain_message("m3", "order with ID: A1 price $149", None),
        ];
        let now = ymd(2024, 6, 15);

        let first = ingest_batch(&messages, &extractor(), &sample_config(), now);
        let second = ingest_batch(&messages, &extractor(), &sample_config(), now);
        assert_eq!(first.orders, second.orders);
        assert_eq!(first.orders.len(), 2);
    }

    #[test]
    fn test_reclassify_uses_new_catalog() {
        let messages = vec![plain_message("m1", "order with ID: A1 price $500", None)];
        let report = ingest_batch(&messages, &extractor(), &sample_config(), ymd(2024, 6, 15));
        assert!(report.orders[0].needs_review);

        let mut config = sample_config();
        config.catalog.push(crate::core::classify::CatalogEntry {
            product_type: "oven".to_string(),
            display_name: "Oven".to_string(),
            price_point: 499.0,
            tolerance: 5.0,
        });
        config.commission_rate = 0.5;

        let reclassified = reclassify(report.orders.clone(), &config);
        assert_eq!(reclassified[0].product, "oven");
        assert!(!reclassified[0].needs_review);
        assert_eq!(reclassified[0].commission, report.orders[0].commission);
    }

    #[tokio::test]
    async fn test_refresh_merges_into_cache() -> Result<()> {
        init_test_tracing();
        let store = MemoryStore::new();
        let config = sample_config();
        let now = ymd(2024, 6, 15);

        let first = StaticSource::new(vec![plain_message(
            "m1",
            "order with ID: A1 price $149",
            None,
        )]);
        let summary = refresh(&first, &store, &extractor(), &config, now).await?;
        assert_eq!(summary.added, 1);
        assert_eq!(summary.total, 1);

        let second = StaticSource::new(vec![
            plain_message("m2", "order with ID: A2 price $25", None),
            plain_message("m1", "order with ID: A1 price $149", None),
        ]);
        let summary = refresh(&second, &store, &extractor(), &config, now).await?;
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.total, 2);

        let cache = load_cached_orders(&store).await?;
        assert_eq!(cache.orders.len(), 2);
        assert_eq!(cache.last_updated, Some(now));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_untouched() -> Result<()> {
        init_test_tracing();
        let store = MemoryStore::new();
        let config = sample_config();
        let now = ymd(2024, 6, 15);

        let source = StaticSource::new(vec![plain_message(
            "m1",
            "order with ID: A1 price $149",
            None,
        )]);
        refresh(&source, &store, &extractor(), &config, now).await?;
        let before = load_cached_orders(&store).await?;

        let result = refresh(&FailingSource, &store, &extractor(), &config, ymd(2024, 6, 16)).await;
        assert!(matches!(result.unwrap_err(), Error::Source { message: _ }));

        assert_eq!(load_cached_orders(&store).await?, before);
        Ok(())
    }
}
