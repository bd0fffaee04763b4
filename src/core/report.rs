//! Report formatting.
//!
//! Turns analytics results, orders, and payouts into plain text for the
//! command line. Nothing here computes figures; see [`crate::core::analytics`].

use crate::core::{
    analytics::AnalyticsReport,
    order::Order,
    payout::PayoutRecord,
    review::ReviewLedger,
};

/// Formats an amount as dollars with thousands separators, e.g. `$1,234.50`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Formats a percentage with one decimal and an explicit sign, e.g. `+12.5%`.
#[must_use]
pub fn format_change(percent: f64) -> String {
    if percent >= 0.0 {
        format!("+{percent:.1}%")
    } else {
        format!("{percent:.1}%")
    }
}

/// Generates a bar for a share of the total.
///
/// Creates a text-based bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `percent` - Share in percent (0-100)
/// * `bar_length` - Length of the bar in characters (default 10)
#[must_use]
pub fn format_share_bar(percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent.clamp(0.0, 100.0);

    // clamped is in [0, 100] and length is small, so the cast cannot truncate
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}] {percent:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// One-line summary of an order: date, id, product, price, commission, status.
#[must_use]
pub fn format_order_line(order: &Order, ledger: &ReviewLedger) -> String {
    let (_, product_name) = ledger.effective_product(order);
    format!(
        "{} | {} | {} | {} | {} | {}",
        order.date.format("%Y-%m-%d"),
        order.order_id,
        product_name,
        format_currency(order.price),
        format_currency(order.commission),
        ledger.order_status(order)
    )
}

/// One-line summary of a payout record.
#[must_use]
pub fn format_payout_line(payout: &PayoutRecord) -> String {
    format!(
        "{} | {} to {} | paid {} | expected {} | {} orders{}",
        payout.id,
        payout.period_start,
        payout.period_end,
        format_currency(payout.amount),
        format_currency(payout.expected_commission),
        payout.order_ids.len(),
        payout
            .notes
            .as_deref()
            .map(|n| format!(" | {n}"))
            .unwrap_or_default()
    )
}

/// Renders the full analytics report.
#[must_use]
pub fn format_report_summary(report: &AnalyticsReport) -> String {
    let stats = &report.stats;
    let growth = &report.growth;

    let mut lines = vec![
        format!("Commission report ({})", report.range),
        format!(
            "Total: {} from {} orders ({} revenue, {} average)",
            format_currency(stats.total_commission),
            stats.total_orders,
            format_currency(stats.total_revenue),
            format_currency(stats.average_order_value)
        ),
        format!(
            "This month: {} from {} orders",
            format_currency(stats.this_month_commission),
            stats.this_month_orders
        ),
        format!(
            "This week: {} from {} orders",
            format_currency(stats.this_week_commission),
            stats.this_week_orders
        ),
    ];
    if stats.pending_review > 0 {
        lines.push(format!("Pending review: {}", stats.pending_review));
    }

    if !report.monthly.is_empty() {
        lines.push(String::new());
        lines.push("Monthly:".to_string());
        lines.extend(report.monthly.iter().map(|month| {
            format!(
                "  {}: {} ({} orders)",
                month.label,
                format_currency(month.commission),
                month.orders
            )
        }));
    }

    if !report.products.is_empty() {
        lines.push(String::new());
        lines.push("Products:".to_string());
        lines.extend(report.products.iter().map(|product| {
            format!(
                "  {}: {} orders, {} {}",
                product.product_name,
                product.orders,
                format_currency(product.revenue),
                format_share_bar(product.order_share, None)
            )
        }));
    }

    lines.push(String::new());
    lines.push("Growth:".to_string());
    lines.push(format!(
        "  Month over month: {} ({} vs {})",
        format_change(growth.month_over_month),
        format_currency(growth.this_month_commission),
        format_currency(growth.last_month_commission)
    ));
    lines.push(format!(
        "  Projected this month: {}",
        format_currency(growth.projected_monthly)
    ));
    if let Some(best) = &growth.best_month {
        lines.push(format!(
            "  Best month: {} ({})",
            best.label,
            format_currency(best.commission)
        ));
    }
    lines.push(format!("  Trend: {}", growth.trend));
    lines.push(format!("  Orders per week: {:.1}", growth.orders_per_week));

    lines.join("\n")
}
