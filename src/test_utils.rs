//! Shared test utilities for `CommissionBuddy`.
//!
//! Fixtures for dates, a small product catalog, orders, raw messages, and an
//! in-memory database store.

use crate::{
    config::{ExtractionConfig, TrackerConfig},
    core::{
        classify::{CatalogEntry, classify},
        message::{BodyData, BodyEncoding, Header, MessageBody, RawMessage},
        order::Order,
    },
    errors::Result,
    store::DatabaseStore,
};
use chrono::{DateTime, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

/// Routes tracing output to the test harness. Safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Noon UTC on the given day.
pub fn ymd(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    ymd_hms(year, month, day, 12, 0, 0)
}

/// The given instant in UTC.
#[allow(clippy::unwrap_used)]
pub fn ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap()
}

/// Two-product catalog.
///
/// # Products
/// * `goldie`: $149 ± $10, "Goldie"
/// * `starter_bundle`: $329.99 ± $15, "Starter Bundle"
pub fn sample_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            product_type: "goldie".to_string(),
            display_name: "Goldie".to_string(),
            price_point: 149.0,
            tolerance: 10.0,
        },
        CatalogEntry {
            product_type: "starter_bundle".to_string(),
            display_name: "Starter Bundle".to_string(),
            price_point: 329.99,
            tolerance: 15.0,
        },
    ]
}

/// Tracker settings with the sample catalog.
///
/// # Defaults
/// * `commission_rate`: 0.15
/// * `accessory_threshold`: 100.0
/// * default extraction patterns
pub fn sample_config() -> TrackerConfig {
    TrackerConfig {
        commission_rate: 0.15,
        accessory_threshold: 100.0,
        catalog: sample_catalog(),
        extraction: ExtractionConfig::default(),
    }
}

/// An order classified with [`sample_config`], from message `msg-<order_id>`.
pub fn order_on(order_id: &str, price: f64, date: DateTime<Utc>) -> Order {
    let config = sample_config();
    Order::new(
        format!("msg-{order_id}"),
        order_id.to_string(),
        price,
        config.commission_rate,
        date,
        classify(price, &config.catalog, config.accessory_threshold),
    )
}

/// A single-part plain text message with an optional `Date` header.
pub fn plain_message(id: &str, text: &str, date: Option<&str>) -> RawMessage {
    let mut headers = vec![Header {
        name: "Subject".to_string(),
        value: "New referred order".to_string(),
    }];
    if let Some(date) = date {
        headers.push(Header {
            name: "Date".to_string(),
            value: date.to_string(),
        });
    }

    RawMessage {
        id: id.to_string(),
        headers,
        body: MessageBody::Single(BodyData {
            encoding: BodyEncoding::Plain,
            data: text.to_string(),
        }),
    }
}

/// Creates an in-memory `SQLite` store with all tables initialized.
pub async fn setup_test_store() -> Result<DatabaseStore> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(DatabaseStore::new(db))
}
