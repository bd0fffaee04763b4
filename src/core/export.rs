//! CSV export of the order view.
//!
//! Columns: `Date, Order ID, Product, Price, Commission, Status`. Every field
//! is quoted, dates are RFC 3339 in UTC and money has two decimals.

use crate::{
    core::{order::Order, review::ReviewLedger},
    errors::Result,
};
use chrono::SecondsFormat;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::Deserialize;
use std::io::{Read, Write};
use tracing::debug;

/// Header row of the export
pub const EXPORT_HEADERS: [&str; 6] = [
    "Date",
    "Order ID",
    "Product",
    "Price",
    "Commission",
    "Status",
];

/// One parsed row of an export file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportRow {
    /// Order timestamp as written
    #[serde(rename = "Date")]
    pub date: String,
    /// Business order id
    #[serde(rename = "Order ID")]
    pub order_id: String,
    /// Product display name
    #[serde(rename = "Product")]
    pub product: String,
    /// Order value
    #[serde(rename = "Price")]
    pub price: f64,
    /// Commission earned
    #[serde(rename = "Commission")]
    pub commission: f64,
    /// Review status label
    #[serde(rename = "Status")]
    pub status: String,
}

/// Writes `orders` as CSV, one header row followed by one row per order.
///
/// Product names and statuses reflect the review ledger.
pub fn export_orders_csv<W: Write>(
    writer: W,
    orders: &[Order],
    ledger: &ReviewLedger,
) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(EXPORT_HEADERS)?;

    for order in orders {
        let (_, product_name) = ledger.effective_product(order);
        csv.write_record([
            order.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            order.order_id.clone(),
            product_name.to_string(),
            format!("{:.2}", order.price),
            format!("{:.2}", order.commission),
            ledger.order_status(order).label().to_string(),
        ])?;
    }

    csv.flush()?;
    debug!("Exported {} orders to CSV", orders.len());
    Ok(())
}

/// Parses an export produced by [`export_orders_csv`].
pub fn read_orders_csv<R: Read>(reader: R) -> Result<Vec<ExportRow>> {
    let mut csv = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut rows = Vec::new();
    for row in csv.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
