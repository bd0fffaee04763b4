use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use commission_buddy::{
    config::{TrackerConfig, database, tracker},
    core::{
        analytics::{DateRange, analyze, filter_orders},
        classify::classify,
        export::export_orders_csv,
        extract::OrderExtractor,
        ingest::{refresh, reclassify},
        order::{OrderCache, find_order, load_cached_orders, save_cached_orders},
        payout::{load_payouts, overlapping_payouts, reconcile_payout, record_payout},
        report::{format_currency, format_order_line, format_payout_line, format_report_summary},
        review::{AssignedProduct, load_review_ledger, save_review_ledger},
        source::JsonFileSource,
    },
    errors::{Error, Result},
    store::DatabaseStore,
};
use dotenvy::dotenv;
use std::{fs::File, io::BufWriter, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "commission-buddy")]
#[command(
    about = "Affiliate commission tracking from order notification emails",
    long_about = None
)]
struct Cli {
    /// Config file path, overrides COMMISSION_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON export of notification messages into the order history
    Ingest {
        /// JSON file holding an array of raw messages
        #[arg(short, long)]
        messages: PathBuf,
    },
    /// Show earnings analytics
    Report {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Show how a price would be classified
    Classify {
        /// Order price
        price: f64,
    },
    /// Manual review of flagged orders
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Payout reconciliation
    Payout {
        #[command(subcommand)]
        action: PayoutAction,
    },
    /// Export orders to CSV
    Export {
        /// Output CSV file path
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Re-run classification over the stored orders with the current catalog
    Reclassify,
}

#[derive(clap::Args)]
struct RangeArgs {
    /// Preset range: this_month, last_30_days, last_90_days, ytd, all_time
    #[arg(long, default_value = "all_time")]
    range: String,
    /// Custom range start (YYYY-MM-DD), overrides --range
    #[arg(long)]
    from: Option<String>,
    /// Custom range end (YYYY-MM-DD, inclusive), overrides --range
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum ReviewAction {
    /// List orders waiting for review
    List,
    /// Open a flagged order for review and show its current decision
    Open {
        /// Order id
        order_id: String,
    },
    /// Assign a product to a flagged order
    Approve {
        /// Order id, e.g. SH43589
        order_id: String,
        /// Product type to assign
        #[arg(short, long)]
        product: String,
        /// Reviewer notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Mark a flagged order as not needing attention
    Dismiss {
        /// Order id
        order_id: String,
        /// Reviewer notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum PayoutAction {
    /// Record a payout for orders dated in a period
    Record {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day of the period, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Amount received
        #[arg(long)]
        amount: f64,
        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// List recorded payouts
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => tracker::load_config(path),
        None => tracker::load_default_config(),
    }
    .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to open database: {}", e))?;
    let store = DatabaseStore::new(db);

    run(cli.command, &config, &store).await
}

async fn run(command: Commands, config: &TrackerConfig, store: &DatabaseStore) -> Result<()> {
    let now = Utc::now();

    match command {
        Commands::Ingest { messages } => {
            let extractor = OrderExtractor::new(&config.extraction)?;
            let source = JsonFileSource::new(messages);
            let summary = refresh(&source, store, &extractor, config, now).await?;
            println!(
                "Fetched {} messages: {} orders extracted, {} new, {} skipped, {} total",
                summary.fetched, summary.extracted, summary.added, summary.skipped, summary.total
            );
        }
        Commands::Report { range } => {
            let range = range.resolve()?;
            let cache = load_cached_orders(store).await?;
            let ledger = load_review_ledger(store).await?;
            let report = analyze(&cache.orders, &range, &ledger, now);
            println!("{}", format_report_summary(&report));
            if let Some(updated) = cache.last_updated {
                println!("\nLast updated: {}", updated.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        Commands::Classify { price } => {
            let result = classify(price, &config.catalog, config.accessory_threshold);
            println!(
                "{} ({}){} | commission {}",
                result.product_name,
                result.product_type,
                if result.needs_review { " | needs review" } else { "" },
                format_currency(price * config.commission_rate)
            );
        }
        Commands::Review { action } => run_review(action, config, store, now).await?,
        Commands::Payout { action } => run_payout(action, store, now).await?,
        Commands::Export { output, range } => {
            let range = range.resolve()?;
            let cache = load_cached_orders(store).await?;
            let ledger = load_review_ledger(store).await?;
            let orders: Vec<_> = filter_orders(&cache.orders, &range, now)
                .into_iter()
                .cloned()
                .collect();

            let file = File::create(&output)?;
            export_orders_csv(BufWriter::new(file), &orders, &ledger)?;
            info!("Exported {} orders to {:?}", orders.len(), output);
            println!("Exported {} orders to {}", orders.len(), output.display());
        }
        Commands::Reclassify => {
            let cache = load_cached_orders(store).await?;
            let before: Vec<bool> = cache.orders.iter().map(|o| o.needs_review).collect();
            let orders = reclassify(cache.orders, config);
            let resolved = orders
                .iter()
                .zip(before)
                .filter(|(o, was_flagged)| *was_flagged && !o.needs_review)
                .count();

            save_cached_orders(
                store,
                &OrderCache {
                    orders,
                    last_updated: cache.last_updated,
                },
            )
            .await?;
            println!("Reclassified orders, {resolved} no longer need review");
        }
    }

    Ok(())
}

async fn run_review(
    action: ReviewAction,
    config: &TrackerConfig,
    store: &DatabaseStore,
    now: DateTime<Utc>,
) -> Result<()> {
    let cache = load_cached_orders(store).await?;
    let mut ledger = load_review_ledger(store).await?;

    match action {
        ReviewAction::List => {
            let pending = ledger.pending_orders(&cache.orders);
            if pending.is_empty() {
                println!("No orders need review");
            }
            for order in pending {
                println!("{}", format_order_line(order, &ledger));
            }
            return Ok(());
        }
        ReviewAction::Open { order_id } => {
            let order = find_order(&cache.orders, &order_id)?;
            let status = ledger.open(order)?.status;
            println!("{}", format_order_line(order, &ledger));
            println!("Review: {status}");
        }
        ReviewAction::Approve {
            order_id,
            product,
            notes,
        } => {
            let order = find_order(&cache.orders, &order_id)?;
            let assigned = AssignedProduct::from_catalog(&product, &config.catalog);
            ledger.approve(order, assigned, notes, now)?;
            println!("Approved {order_id} as {product}");
        }
        ReviewAction::Dismiss { order_id, notes } => {
            let order = find_order(&cache.orders, &order_id)?;
            ledger.dismiss(order, notes, now)?;
            println!("Dismissed {order_id}");
        }
    }

    save_review_ledger(store, &ledger).await
}

async fn run_payout(action: PayoutAction, store: &DatabaseStore, now: DateTime<Utc>) -> Result<()> {
    match action {
        PayoutAction::Record {
            from,
            to,
            amount,
            notes,
        } => {
            let start = parse_day(&from)?;
            let end = parse_day(&to)?;
            let cache = load_cached_orders(store).await?;
            let record = reconcile_payout(&cache.orders, start, end, amount, notes, now)?;

            let overlaps = overlapping_payouts(&load_payouts(store).await?, start, end).len();
            println!("{}", format_payout_line(&record));
            if overlaps > 0 {
                println!("Warning: overlaps {overlaps} earlier payout(s)");
            }
            record_payout(store, record).await?;
        }
        PayoutAction::List => {
            let payouts = load_payouts(store).await?;
            if payouts.is_empty() {
                println!("No payouts recorded");
            }
            for payout in &payouts {
                println!("{}", format_payout_line(payout));
            }
        }
    }
    Ok(())
}

impl RangeArgs {
    fn resolve(&self) -> Result<DateRange> {
        if self.from.is_none() && self.to.is_none() {
            return self.range.parse();
        }

        let start = self.from.as_deref().map(parse_day).transpose()?;
        let end = self.to.as_deref().map(parse_day).transpose()?;
        DateRange::from_days(start, end)
    }
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| Error::Parse {
        message: format!("invalid date '{value}', expected YYYY-MM-DD: {e}"),
    })
}
