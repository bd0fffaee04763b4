//! Earnings analytics over the order history.
//!
//! Everything here is a pure function of the orders, a date filter, the review
//! ledger, and the current time. Calendar math is done in UTC and weeks start
//! on Sunday.
//!
//! Two deliberate quirks:
//! - The "this month" and "this week" headline figures always look at the full
//!   history relative to now, whatever date filter is selected.
//! - Growth metrics use the full history too, so trends are not skewed by the
//!   current filter.

use crate::{
    core::{order::Order, review::ReviewLedger},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which orders an analytics view covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    /// From the first day of the current month
    ThisMonth,
    /// The last 30 days
    Last30Days,
    /// The last 90 days
    Last90Days,
    /// From January 1st of the current year
    YearToDate,
    /// No filtering
    #[default]
    AllTime,
    /// Explicit bounds, either of which may be open
    Custom {
        /// Inclusive lower bound
        start: Option<DateTime<Utc>>,
        /// Inclusive upper bound
        end: Option<DateTime<Utc>>,
    },
}

impl DateRange {
    /// Builds a custom range.
    ///
    /// # Errors
    /// Returns `Error::InvalidDateRange` if both bounds are set and
    /// `start > end`.
    pub fn custom(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::InvalidDateRange {
                    start: s.to_rfc3339(),
                    end: e.to_rfc3339(),
                });
            }
        }
        Ok(Self::Custom { start, end })
    }

    /// Builds a custom range from calendar days, covering all of `end`.
    ///
    /// # Errors
    /// Returns `Error::InvalidDateRange` if `start` is after `end`.
    pub fn from_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        let end = end.map(|day| {
            day.succ_opt().map_or(DateTime::<Utc>::MAX_UTC, |next| {
                start_of_day(next) - Duration::nanoseconds(1)
            })
        });
        Self::custom(start.map(start_of_day), end)
    }

    /// Resolves the range to concrete bounds relative to `now`.
    #[must_use]
    pub fn bounds(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let today = now.date_naive();
        match *self {
            Self::ThisMonth => (Some(start_of_day(first_of_month(today))), None),
            Self::Last30Days => (Some(now - Duration::days(30)), None),
            Self::Last90Days => (Some(now - Duration::days(90)), None),
            Self::YearToDate => (Some(start_of_day(first_of_year(today))), None),
            Self::AllTime => (None, None),
            Self::Custom { start, end } => (start, end),
        }
    }

    /// Whether `date` falls inside the range, bounds inclusive.
    #[must_use]
    pub fn contains(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds(now);
        start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
    }

    /// Preset name, or `"custom"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ThisMonth => "this_month",
            Self::Last30Days => "last_30_days",
            Self::Last90Days => "last_90_days",
            Self::YearToDate => "ytd",
            Self::AllTime => "all_time",
            Self::Custom { .. } => "custom",
        }
    }
}

const PRESET_NAMES: [&str; 5] = [
    "this_month",
    "last_30_days",
    "last_90_days",
    "ytd",
    "all_time",
];

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "this_month" => Ok(Self::ThisMonth),
            "last_30_days" => Ok(Self::Last30Days),
            "last_90_days" => Ok(Self::Last90Days),
            "ytd" => Ok(Self::YearToDate),
            "all_time" => Ok(Self::AllTime),
            other => Err(Error::Parse {
                message: format!(
                    "unknown date range '{other}', expected one of: {}",
                    PRESET_NAMES.join(", ")
                ),
            }),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orders inside `range`, in input order.
#[must_use]
pub fn filter_orders<'a>(
    orders: &'a [Order],
    range: &DateRange,
    now: DateTime<Utc>,
) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|o| range.contains(o.date, now))
        .collect()
}

/// Headline figures.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    /// Commission over the filtered orders
    pub total_commission: f64,
    /// Number of filtered orders
    pub total_orders: usize,
    /// Revenue over the filtered orders
    pub total_revenue: f64,
    /// Mean price of the filtered orders, zero when there are none
    pub average_order_value: f64,
    /// Commission in the current calendar month, full history
    pub this_month_commission: f64,
    /// Orders in the current calendar month, full history
    pub this_month_orders: usize,
    /// Commission in the current week, full history
    pub this_week_commission: f64,
    /// Orders in the current week, full history
    pub this_week_orders: usize,
    /// Filtered orders still waiting for review
    pub pending_review: usize,
}

/// Totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// Label such as `"Jun 2024"`
    pub label: String,
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1-12
    pub month: u32,
    /// Commission earned
    pub commission: f64,
    /// Number of orders
    pub orders: usize,
    /// Order revenue
    pub revenue: f64,
}

/// Totals for one product type.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductStats {
    /// Product type
    pub product_type: String,
    /// Display name
    pub product_name: String,
    /// Number of orders
    pub orders: usize,
    /// Order revenue
    pub revenue: f64,
    /// Commission earned
    pub commission: f64,
    /// Share of all filtered orders, in percent
    pub order_share: f64,
    /// Share of all filtered revenue, in percent
    pub revenue_share: f64,
}

/// Direction of recent monthly earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Latest month more than 10% above the one before
    Growing,
    /// Within 10% either way, or not enough history
    Stable,
    /// Latest month more than 10% below the one before
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Growing => "growing",
            Self::Stable => "stable",
            Self::Declining => "declining",
        })
    }
}

/// Trend figures over the full history.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthMetrics {
    /// Commission in the current calendar month
    pub this_month_commission: f64,
    /// Commission in the previous calendar month
    pub last_month_commission: f64,
    /// Month-over-month change in percent
    pub month_over_month: f64,
    /// Current month's pace extrapolated to the whole month
    pub projected_monthly: f64,
    /// Month with the highest commission
    pub best_month: Option<MonthlySummary>,
    /// Direction of the two most recent months
    pub trend: Trend,
    /// Average orders per week between the oldest and newest order
    pub orders_per_week: f64,
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    /// The filter the report was computed for
    pub range: DateRange,
    /// Headline figures
    pub stats: DashboardStats,
    /// Filtered orders by month, oldest first
    pub monthly: Vec<MonthlySummary>,
    /// Filtered orders by product
    pub products: Vec<ProductStats>,
    /// Full-history trends
    pub growth: GrowthMetrics,
}

/// Computes the full analytics report.
#[must_use]
pub fn analyze(
    orders: &[Order],
    range: &DateRange,
    ledger: &ReviewLedger,
    now: DateTime<Utc>,
) -> AnalyticsReport {
    let filtered = filter_orders(orders, range, now);

    AnalyticsReport {
        range: *range,
        stats: compute_stats(orders, &filtered, ledger, now),
        monthly: monthly_rollup(filtered.iter().copied()),
        products: product_stats(&filtered, ledger),
        growth: growth_metrics(orders, now),
    }
}

/// Headline figures for the filtered orders plus month and week figures over
/// all orders.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_stats(
    all: &[Order],
    filtered: &[&Order],
    ledger: &ReviewLedger,
    now: DateTime<Utc>,
) -> DashboardStats {
    let total_commission: f64 = filtered.iter().map(|o| o.commission).sum();
    let total_revenue: f64 = filtered.iter().map(|o| o.price).sum();
    let total_orders = filtered.len();

    let today = now.date_naive();
    let week_start = start_of_day(start_of_week(today));
    let week_end = week_start + Duration::days(7);

    let (this_month_commission, this_month_orders) =
        sum_commission(all.iter().filter(|o| same_month(o.date.date_naive(), today)));
    let (this_week_commission, this_week_orders) =
        sum_commission(all.iter().filter(|o| o.date >= week_start && o.date < week_end));

    DashboardStats {
        total_commission,
        total_orders,
        total_revenue,
        average_order_value: if total_orders > 0 {
            total_revenue / total_orders as f64
        } else {
            0.0
        },
        this_month_commission,
        this_month_orders,
        this_week_commission,
        this_week_orders,
        pending_review: filtered
            .iter()
            .filter(|o| o.needs_review && !ledger.status_of(&o.order_id).is_terminal())
            .count(),
    }
}

/// Groups orders by calendar month, oldest first.
#[must_use]
pub fn monthly_rollup<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), (f64, usize, f64)> = BTreeMap::new();

    for order in orders {
        let bucket = months
            .entry((order.date.year(), order.date.month()))
            .or_insert((0.0, 0, 0.0));
        bucket.0 += order.commission;
        bucket.1 += 1;
        bucket.2 += order.price;
    }

    months
        .into_iter()
        .map(|((year, month), (commission, count, revenue))| MonthlySummary {
            label: month_label(year, month),
            year,
            month,
            commission,
            orders: count,
            revenue,
        })
        .collect()
}

/// Groups orders by product, using approved review assignments where present.
///
/// Sorted by order count, then revenue, both descending, then product type.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn product_stats(orders: &[&Order], ledger: &ReviewLedger) -> Vec<ProductStats> {
    let total_orders = orders.len();
    let total_revenue: f64 = orders.iter().map(|o| o.price).sum();

    let mut products: BTreeMap<&str, ProductStats> = BTreeMap::new();
    for order in orders {
        let (product_type, product_name) = ledger.effective_product(order);
        let entry = products
            .entry(product_type)
            .or_insert_with(|| ProductStats {
                product_type: product_type.to_string(),
                product_name: product_name.to_string(),
                orders: 0,
                revenue: 0.0,
                commission: 0.0,
                order_share: 0.0,
                revenue_share: 0.0,
            });
        entry.orders += 1;
        entry.revenue += order.price;
        entry.commission += order.commission;
    }

    let mut stats: Vec<ProductStats> = products
        .into_values()
        .map(|mut p| {
            p.order_share = percentage(p.orders as f64, total_orders as f64);
            p.revenue_share = percentage(p.revenue, total_revenue);
            p
        })
        .collect();

    stats.sort_by(|a, b| {
        b.orders
            .cmp(&a.orders)
            .then_with(|| b.revenue.total_cmp(&a.revenue))
            .then_with(|| a.product_type.cmp(&b.product_type))
    });
    stats
}

/// Trend figures over the full order history.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn growth_metrics(all: &[Order], now: DateTime<Utc>) -> GrowthMetrics {
    let today = now.date_naive();
    let last_month_day = first_of_month(today) - Duration::days(1);

    let (this_month_commission, _) =
        sum_commission(all.iter().filter(|o| same_month(o.date.date_naive(), today)));
    let (last_month_commission, _) = sum_commission(
        all.iter()
            .filter(|o| same_month(o.date.date_naive(), last_month_day)),
    );

    let monthly = monthly_rollup(all);
    let best_month = monthly.iter().fold(None::<&MonthlySummary>, |best, m| match best {
        Some(b) if b.commission >= m.commission => Some(b),
        _ => Some(m),
    });

    GrowthMetrics {
        this_month_commission,
        last_month_commission,
        month_over_month: month_over_month(this_month_commission, last_month_commission),
        projected_monthly: projected_monthly(this_month_commission, today),
        best_month: best_month.cloned(),
        trend: classify_trend(&monthly),
        orders_per_week: orders_per_week(all),
    }
}

/// Percent change from `last_month` to `this_month`.
///
/// With nothing last month the change is 100 if anything was earned this
/// month and 0 otherwise.
#[must_use]
pub fn month_over_month(this_month: f64, last_month: f64) -> f64 {
    if last_month == 0.0 {
        return if this_month > 0.0 { 100.0 } else { 0.0 };
    }
    (this_month - last_month) / last_month * 100.0
}

/// Linear extrapolation of this month's commission to the full month.
#[must_use]
pub fn projected_monthly(this_month_commission: f64, today: NaiveDate) -> f64 {
    this_month_commission / f64::from(today.day()) * f64::from(days_in_month(today))
}

/// Compares the two most recent monthly totals.
#[must_use]
pub fn classify_trend(monthly: &[MonthlySummary]) -> Trend {
    let [.., previous, recent] = monthly else {
        return Trend::Stable;
    };

    if recent.commission > previous.commission * 1.1 {
        Trend::Growing
    } else if recent.commission < previous.commission * 0.9 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Orders per week across the span between the oldest and newest order.
///
/// Spans shorter than a week count as one week.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn orders_per_week(orders: &[Order]) -> f64 {
    let oldest = orders.iter().map(|o| o.date).min();
    let newest = orders.iter().map(|o| o.date).max();

    let (Some(oldest), Some(newest)) = (oldest, newest) else {
        return 0.0;
    };

    let weeks = (newest - oldest).num_days() as f64 / 7.0;
    orders.len() as f64 / weeks.max(1.0)
}

fn sum_commission<'a>(orders: impl Iterator<Item = &'a Order>) -> (f64, usize) {
    orders.fold((0.0, 0), |(sum, count), o| (sum + o.commission, count + 1))
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| u32::try_from((next - first).num_days()).ok())
        .unwrap_or(31)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map_or_else(|| format!("{month:02} {year}"), |d| d.format("%b %Y").to_string())
}
