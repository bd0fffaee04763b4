//! Product classification by price point.
//!
//! Notifications carry a price but no product, so the product is inferred from
//! the price. Each catalog entry accepts the closed interval
//! `[price_point - tolerance, price_point + tolerance]`; shipping and small
//! discounts move the price without changing the product. Entries are tried in
//! catalog order and the first match wins. Unmatched low-value orders are
//! accessories; unmatched orders at or above the threshold go to manual review.

use serde::{Deserialize, Serialize};

/// Product type assigned to unmatched orders below the accessory threshold
pub const ACCESSORY_PRODUCT_TYPE: &str = "accessory";
/// Display name for accessory orders
pub const ACCESSORY_PRODUCT_NAME: &str = "Accessory";
/// Product type assigned to orders that need manual review
pub const UNKNOWN_PRODUCT_TYPE: &str = "unknown";
/// Display name for unknown orders
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";

/// One configured product, identified by its price point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable product identifier (e.g. `"goldie"`)
    pub product_type: String,
    /// Human-readable product name
    pub display_name: String,
    /// Nominal price
    pub price_point: f64,
    /// Half-width of the accepted price band
    pub tolerance: f64,
}

impl CatalogEntry {
    /// Whether `price` falls in this entry's inclusive acceptance interval.
    #[must_use]
    pub fn matches(&self, price: f64) -> bool {
        price >= self.price_point - self.tolerance && price <= self.price_point + self.tolerance
    }
}

/// Result of classifying one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Matched product type, `"accessory"`, or `"unknown"`
    pub product_type: String,
    /// Display name for the product type
    pub product_name: String,
    /// True when no product could be inferred and a human must decide
    pub needs_review: bool,
}

/// Classifies a price against the catalog.
///
/// # Arguments
/// * `price` - Order price
/// * `catalog` - Entries in priority order
/// * `accessory_threshold` - Unmatched prices in `(0, threshold)` are accessories
#[must_use]
pub fn classify(price: f64, catalog: &[CatalogEntry], accessory_threshold: f64) -> Classification {
    if let Some(entry) = catalog.iter().find(|entry| entry.matches(price)) {
        return Classification {
            product_type: entry.product_type.clone(),
            product_name: entry.display_name.clone(),
            needs_review: false,
        };
    }

    if price > 0.0 && price < accessory_threshold {
        return Classification {
            product_type: ACCESSORY_PRODUCT_TYPE.to_string(),
            product_name: ACCESSORY_PRODUCT_NAME.to_string(),
            needs_review: false,
        };
    }

    Classification {
        product_type: UNKNOWN_PRODUCT_TYPE.to_string(),
        product_name: UNKNOWN_PRODUCT_NAME.to_string(),
        needs_review: true,
    }
}

/// Looks up the display name for a product type, including the built-in types.
#[must_use]
pub fn display_name_for<'a>(product_type: &'a str, catalog: &'a [CatalogEntry]) -> &'a str {
    match product_type {
        ACCESSORY_PRODUCT_TYPE => ACCESSORY_PRODUCT_NAME,
        UNKNOWN_PRODUCT_TYPE => UNKNOWN_PRODUCT_NAME,
        other => catalog
            .iter()
            .find(|entry| entry.product_type == other)
            .map_or(other, |entry| entry.display_name.as_str()),
    }
}
