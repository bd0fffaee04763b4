//! Order extraction from normalized notification text.
//!
//! Two independent patterns run over the text: one anchored on the order
//! identifier marker, one on the currency-prefixed amount. A message yields a
//! candidate only when both match; anything else is a non-order notification.

use crate::config::ExtractionConfig;
use crate::errors::{Error, Result};
use regex::Regex;

/// An `(order id, price)` pair pulled out of a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedOrder {
    /// Business order code
    pub order_id: String,
    /// Order value with thousands separators removed
    pub price: f64,
}

/// Compiled extraction patterns.
#[derive(Debug, Clone)]
pub struct OrderExtractor {
    order_id: Regex,
    price: Regex,
}

impl OrderExtractor {
    /// Compiles the configured patterns.
    ///
    /// # Errors
    /// Returns `Error::Pattern` if a pattern does not compile, or
    /// `Error::Config` if a pattern has no capture group.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let order_id = compile_with_group(&config.order_id_pattern)?;
        let price = compile_with_group(&config.price_pattern)?;
        Ok(Self { order_id, price })
    }

    /// Extracts an order candidate from plain text.
    ///
    /// Returns `None` when either pattern misses or the captured amount is not
    /// a number.
    #[must_use]
    pub fn extract(&self, text: &str) -> Option<ExtractedOrder> {
        let order_id = self.order_id.captures(text)?.get(1)?.as_str().trim();
        let price_text = self.price.captures(text)?.get(1)?.as_str();

        if order_id.is_empty() {
            return None;
        }

        let price = parse_price(price_text)?;
        Some(ExtractedOrder {
            order_id: order_id.to_string(),
            price,
        })
    }
}

fn compile_with_group(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)?;
    if regex.captures_len() < 2 {
        return Err(Error::Config {
            message: format!("extraction pattern '{pattern}' needs a capture group"),
        });
    }
    Ok(regex)
}

/// Parses an amount like `1,329.99`, stripping every thousands separator.
///
/// Returns `None` for empty, negative, or non-finite values.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let price: f64 = cleaned.trim().parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn extractor() -> OrderExtractor {
        OrderExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_standard_notification() {
        let text = "There is a new referred order with ID: SH43589 and price $329.99";
        let order = extractor().extract(text).unwrap();
        assert_eq!(order.order_id, "SH43589");
        assert_eq!(order.price, 329.99);
    }

    #[test]
    fn test_extract_strips_all_thousands_separators() {
        let text = "order with ID: SH9 and price $1,234,567.50";
        assert_eq!(extractor().extract(text).unwrap().price, 1_234_567.5);
    }

    #[test]
    fn test_extract_without_currency_symbol() {
        let text = "Order With Id: ab12 price 149";
        let order = extractor().extract(text).unwrap();
        assert_eq!(order.order_id, "ab12");
        assert_eq!(order.price, 149.0);
    }

    #[test]
    fn test_extract_requires_both_patterns() {
        assert!(extractor().extract("order with ID: SH1 shipped").is_none());
        assert!(extractor().extract("Your price $20.00 receipt").is_none());
        assert!(extractor().extract("").is_none());
    }

    #[test]
    fn test_extract_with_custom_patterns() {
        let config = ExtractionConfig {
            order_id_pattern: r"Order #(\d+)".to_string(),
            price_pattern: r"Total: €([\d,.]+)".to_string(),
        };
        let extractor = OrderExtractor::new(&config).unwrap();
        let order = extractor.extract("Order #5512 confirmed. Total: €89.00").unwrap();
        assert_eq!(order.order_id, "5512");
        assert_eq!(order.price, 89.0);
    }

    #[test]
    fn test_new_rejects_pattern_without_group() {
        let config = ExtractionConfig {
            order_id_pattern: "order".to_string(),
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            OrderExtractor::new(&config).unwrap_err(),
            Error::Config { message: _ }
        ));
    }

    #[test]
    fn test_new_rejects_invalid_regex() {
        let config = ExtractionConfig {
            price_pattern: "price (".to_string(),
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            OrderExtractor::new(&config).unwrap_err(),
            Error::Pattern(_)
        ));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,329.99"), Some(1329.99));
        assert_eq!(parse_price("25."), Some(25.0));
        assert_eq!(parse_price(","), None);
        assert_eq!(parse_price("-5"), None);
    }
}
