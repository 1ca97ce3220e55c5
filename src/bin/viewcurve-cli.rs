use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use viewcurve::config::{parse_windows, Config, EstimatorConfig};
use viewcurve::estimator::report::resolve_horizon;
use viewcurve::estimator::{
    build_report, EstimatedDailyCohortStat, KindFilter, RateCalculator, RawVideoRecord,
    SnapshotBatch, VideoRates,
};
use viewcurve::provider::{self, JsonFileProvider};

#[derive(Parser)]
#[command(name = "viewcurve-cli")]
#[command(about = "Offline view-trajectory analysis of channel snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SnapshotArgs {
    /// JSON file with an array of video records
    #[arg(short, long)]
    input: PathBuf,
    /// Snapshot time (RFC 3339); defaults to now
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Views-per-hour for every video
    Rates {
        #[command(flatten)]
        snapshot: SnapshotArgs,
        /// Comma-separated windows, e.g. 24h,3d,7d
        #[arg(long)]
        windows: Option<String>,
    },
    /// Day-by-day percentile bands of estimated cumulative views
    Cohort {
        #[command(flatten)]
        snapshot: SnapshotArgs,
        /// Horizon in days; defaults to the oldest video's age
        #[arg(long)]
        max_days: Option<u32>,
        /// all, short or long_form
        #[arg(long)]
        kind: Option<KindFilter>,
    },
    /// Fetch a channel through the configured provider and report on it
    Report {
        /// Channel id (UC...)
        channel_id: String,
        #[arg(long)]
        max_days: Option<u32>,
        #[arg(long)]
        kind: Option<KindFilter>,
    },
}

async fn load_batch(args: &SnapshotArgs) -> Result<SnapshotBatch> {
    let records: Vec<RawVideoRecord> = JsonFileProvider::new(&args.input).load_all().await?;
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    SnapshotBatch::new(records, as_of).context("snapshot contains an invalid record")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn print_rates(rows: &[VideoRates]) {
    let Some(first) = rows.first() else {
        println!("No videos in snapshot.");
        return;
    };

    print!("{:<16} {:<10} {:>8} {:>12}", "Video", "Kind", "Age (d)", "Views");
    for rate in &first.rates {
        print!(" {:>12}", format!("VPH {}", rate.window));
    }
    println!();
    println!("{}", "-".repeat(50 + 13 * first.rates.len()));

    for row in rows {
        print!(
            "{:<16} {:<10} {:>8} {:>12}",
            row.id,
            format!("{:?}", row.kind),
            row.age_days,
            row.view_count
        );
        for rate in &row.rates {
            print!(" {:>12.2}", rate.vph);
        }
        println!();
    }
}

fn print_cohort(days: &[EstimatedDailyCohortStat]) {
    println!(
        "{:>5} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Day", "N", "Min", "P10", "P25", "Median", "P75", "P90", "Max"
    );
    println!("{}", "-".repeat(110));
    for day in days {
        println!(
            "{:>5} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            day.day,
            day.sample_size,
            format_stat(day.min),
            format_stat(day.p10),
            format_stat(day.lower_bound),
            format_stat(day.median),
            format_stat(day.upper_bound),
            format_stat(day.p90),
            format_stat(day.max),
        );
    }
}

fn estimator_config() -> Result<EstimatorConfig> {
    Ok(Config::from_env()?.estimator)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rates { snapshot, windows } => {
            let config = estimator_config()?;
            let batch = load_batch(&snapshot).await?;
            let calculator = match windows {
                Some(list) => RateCalculator::new(config.rate_policy, parse_windows(&list)?)?
                    .with_shorts_threshold(config.shorts_max_duration_secs),
                None => config.rate_calculator()?,
            };
            let rows = calculator.rates_table(&batch);
            if snapshot.json {
                print_json(&rows)?;
            } else {
                print_rates(&rows);
            }
        }
        Commands::Cohort {
            snapshot,
            max_days,
            kind,
        } => {
            let config = estimator_config()?;
            let batch = load_batch(&snapshot).await?;
            let max_days = resolve_horizon(&batch, max_days, &config);
            let table = config
                .cohort_estimator(max_days)?
                .with_filter(kind.unwrap_or(config.kind_filter))
                .estimate_detailed(&batch);
            if snapshot.json {
                print_json(&table)?;
            } else {
                print_cohort(&table.days);
                println!(
                    "\n{} of {} videos contributed ({} without views, {} filtered by kind, {} under a day old)",
                    table.contributing_videos,
                    batch.len(),
                    table.excluded_zero_views,
                    table.excluded_by_kind,
                    table.excluded_too_young
                );
            }
        }
        Commands::Report {
            channel_id,
            max_days,
            kind,
        } => {
            let config = Config::from_env()?;
            let provider = provider::from_config(&config.provider)?
                .context("set PROVIDER=youtube or PROVIDER=file to fetch channels")?;
            let records = provider.fetch_channel(&channel_id).await?;
            let batch = SnapshotBatch::new(records, Utc::now())
                .context("provider returned an invalid record")?;
            let report = build_report(
                &batch,
                &config.estimator,
                Some(&channel_id),
                max_days,
                kind,
            )?;
            print_json(&report)?;
        }
    }

    Ok(())
}
