use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod export;
mod filters;
mod format;
mod insights;
mod models;
mod poll;
mod report;
mod store;
mod views;

use crate::api::{HttpApi, PerformanceApi};
use crate::config::PerfConfig;
use crate::export::{ExportArtifact, ExportColumn};
use crate::filters::{FilterOverride, Setting};
use crate::models::{rank_entries, Period};
use crate::store::{Outcome, PerformanceStore};

#[derive(Parser)]
#[command(name = "waste-perf")]
#[command(about = "Resident performance reports, leaderboards and exports", long_about = None)]
struct Cli {
    /// Config file (defaults to ./waste-perf.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    #[arg(long, value_enum)]
    period: Option<Period>,
    /// Zone id or name; `all` drops a zone set in the config file
    #[arg(long)]
    zone: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    months: Option<u32>,
}

impl From<&FilterArgs> for FilterOverride {
    fn from(args: &FilterArgs) -> Self {
        let zone = match args.zone.as_deref() {
            Some(zone) if zone.eq_ignore_ascii_case("all") => Setting::Clear,
            other => Setting::from(other.map(str::to_string)),
        };
        FilterOverride {
            period: args.period.into(),
            zone,
            limit: args.limit.into(),
            months: args.months.into(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Html,
}

#[derive(Args, Clone)]
struct ExportArgs {
    /// Write the listing to a file as well
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,
    /// File name without extension
    #[arg(long)]
    out: Option<String>,
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List performance reports
    Reports {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Show a single report
    Report { id: String },
    /// Ranked residents
    Leaderboard {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Highest scoring residents
    TopPerformers {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Analytics for yourself or a given resident
    Analytics {
        #[arg(long)]
        resident: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Completion rate per task category
    Categories {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Month-by-month trend
    Trends {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Environmental impact totals
    Impact {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Compare zones
    Zones {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Headline totals and grade distribution
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Stats, top performers and zone comparison in one load
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Refresh the dashboard on an interval until Ctrl-C
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
        /// Seconds between refreshes (overrides poll_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Generate a report for one resident
    Generate {
        #[arg(long)]
        resident: String,
        #[arg(long, value_enum)]
        period: Period,
    },
    /// Generate reports for every resident
    BulkGenerate {
        #[arg(long, value_enum)]
        period: Period,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info,waste_perf=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn ensure_applied<A: PerformanceApi>(
    outcome: Outcome,
    store: &PerformanceStore<A>,
) -> anyhow::Result<()> {
    match outcome {
        Outcome::Failed => {
            let message = store
                .read(|state| state.error.clone())
                .unwrap_or_else(|| "request failed".to_string());
            bail!(message)
        }
        Outcome::Applied | Outcome::Stale => Ok(()),
    }
}

fn write_export<T>(
    records: &[T],
    columns: &[ExportColumn<T>],
    args: &ExportArgs,
    stem: &str,
    title: &str,
) -> anyhow::Result<()> {
    let Some(format) = args.export else {
        return Ok(());
    };
    let name = args.out.as_deref().unwrap_or(stem);
    let artifact = match format {
        ExportFormat::Csv => ExportArtifact::csv(name, export::to_csv(records, columns)?),
        ExportFormat::Html => ExportArtifact::html(
            name,
            report::render_html(title, records, columns, Utc::now()),
        ),
    };
    let path = artifact.write_to(&args.dir)?;
    println!(
        "Exported {} records to {} ({}).",
        records.len(),
        path.display(),
        artifact.mime
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = PerfConfig::load(cli.config.as_deref())?;
    let api = HttpApi::new(&config).context("failed to build HTTP client")?;
    let store = Arc::new(PerformanceStore::new(api, config.filters.clone()));

    match cli.command {
        Commands::Reports { filters, export: out } => {
            let outcome = store.fetch_reports(&FilterOverride::from(&filters)).await;
            ensure_applied(outcome, &store)?;
            let state = store.snapshot();
            print!(
                "{}",
                views::reports(&state.reports, state.reports_pagination.as_ref())
            );
            write_export(
                &state.reports,
                &export::report_columns(),
                &out,
                "performance-reports",
                "Performance Reports",
            )?;
        }
        Commands::Report { id } => {
            ensure_applied(store.fetch_report(&id).await, &store)?;
            match store.snapshot().current_report {
                Some(report) => print!("{}", views::report_detail(&report)),
                None => println!("Report {id} not found."),
            }
        }
        Commands::Leaderboard { filters, export: out } => {
            let outcome = store.fetch_leaderboard(&FilterOverride::from(&filters)).await;
            ensure_applied(outcome, &store)?;
            let entries = store.snapshot().leaderboard;
            print!("{}", views::leaderboard("Leaderboard", &entries));
            write_export(
                &rank_entries(&entries),
                &export::leaderboard_columns(),
                &out,
                "leaderboard",
                "Resident Leaderboard",
            )?;
        }
        Commands::TopPerformers { filters } => {
            let outcome = store
                .fetch_top_performers(&FilterOverride::from(&filters))
                .await;
            ensure_applied(outcome, &store)?;
            print!(
                "{}",
                views::leaderboard("Top performers", &store.snapshot().top_performers)
            );
        }
        Commands::Analytics { resident, filters } => {
            let over = FilterOverride::from(&filters);
            let snapshot = match resident.as_deref() {
                Some(id) => {
                    ensure_applied(store.fetch_resident_analytics(id, &over).await, &store)?;
                    store.snapshot().resident_analytics
                }
                None => {
                    ensure_applied(store.fetch_my_analytics(&over).await, &store)?;
                    store.snapshot().my_analytics
                }
            };
            match snapshot {
                Some(snapshot) => print!("{}", views::analytics(&snapshot)),
                None => println!("No analytics available yet."),
            }
        }
        Commands::Categories { filters } => {
            let outcome = store
                .fetch_category_analytics(&FilterOverride::from(&filters))
                .await;
            ensure_applied(outcome, &store)?;
            print!(
                "{}",
                views::categories(&store.snapshot().category_analytics)
            );
        }
        Commands::Trends { filters, export: out } => {
            let outcome = store.fetch_trends(&FilterOverride::from(&filters)).await;
            ensure_applied(outcome, &store)?;
            let trends = store.snapshot().trends;
            print!("{}", views::trends(&trends));
            write_export(
                &trends,
                &export::trend_columns(),
                &out,
                "performance-trends",
                "Performance Trends",
            )?;
        }
        Commands::Impact { filters } => {
            let outcome = store
                .fetch_environmental_impact(&FilterOverride::from(&filters))
                .await;
            ensure_applied(outcome, &store)?;
            match store.snapshot().environmental_impact {
                Some(impact) => print!("{}", views::impact(&impact)),
                None => println!("No environmental impact recorded."),
            }
        }
        Commands::Zones { filters } => {
            let outcome = store
                .fetch_zone_comparison(&FilterOverride::from(&filters))
                .await;
            ensure_applied(outcome, &store)?;
            print!("{}", views::zones(&store.snapshot().zone_comparison));
        }
        Commands::Stats { filters } => {
            let outcome = store
                .fetch_dashboard_stats(&FilterOverride::from(&filters))
                .await;
            ensure_applied(outcome, &store)?;
            match store.snapshot().dashboard_stats {
                Some(totals) => print!("{}", views::stats(&totals)),
                None => println!("No stats available yet."),
            }
        }
        Commands::Dashboard { filters } => {
            let outcomes = store.load_dashboard(&FilterOverride::from(&filters)).await;
            print!("{}", store.read(views::dashboard));
            if outcomes.iter().all(|outcome| *outcome == Outcome::Failed) {
                bail!("dashboard could not be loaded");
            }
        }
        Commands::Watch { filters, interval } => {
            let persisted = FilterOverride::from(&filters);
            if !persisted.is_empty() {
                store.set_filters(&persisted);
            }
            let over = FilterOverride::default();
            let period = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.poll_interval());
            let poll_store = Arc::clone(&store);
            let handle = poll::spawn(period, move || {
                let store = Arc::clone(&poll_store);
                let over = over.clone();
                async move {
                    store.load_dashboard(&over).await;
                    println!("--- {} ---", Utc::now().format("%H:%M:%S"));
                    print!("{}", store.read(views::dashboard));
                }
            });
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            handle.stop();
            store.clear_filters();
            tracing::debug!("watch filters reset to configured defaults");
            println!("Stopped watching.");
        }
        Commands::Generate { resident, period } => {
            let report = store.generate_report(&resident, period).await?;
            println!(
                "Generated report {} for {} ({}).",
                report.id,
                report.resident_name(),
                period
            );
        }
        Commands::BulkGenerate { period } => {
            let summary = store.bulk_generate_reports(period).await?;
            println!("{summary}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_all_clears_the_persisted_zone() {
        let args = FilterArgs {
            zone: Some("All".to_string()),
            limit: Some(5),
            ..FilterArgs::default()
        };
        let over = FilterOverride::from(&args);
        assert_eq!(over.zone, Setting::Clear);
        assert_eq!(over.limit, Setting::Set(5));
        assert_eq!(over.period, Setting::Keep);

        let named = FilterOverride::from(&FilterArgs {
            zone: Some("north".to_string()),
            ..FilterArgs::default()
        });
        assert_eq!(named.zone, Setting::Set("north".to_string()));
    }
}
