// src/cli.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use crate::calendar::Calendar;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::database::models::{Granularity, RawBar, Symbol};
use crate::database::{PeriodStore, PostgresStore};
use crate::processor::{RecomputeDriver, RecomputeJob};

#[derive(Parser)]
#[command(name = "breakout-pattern-calculator")]
#[command(about = "Breakout pattern aggregation and classification engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema and seed configured symbols
    InitDb,

    /// Import raw bars from a CSV file and aggregate them into summaries
    Import {
        /// CSV file with open_time,open,high,low,close,volume rows
        /// (open_time in epoch milliseconds)
        #[arg(short, long)]
        file: PathBuf,

        /// Symbol the bars belong to (e.g. "BTCUSDT")
        #[arg(short, long)]
        symbol: String,

        /// Exchange the bars came from
        #[arg(long, default_value = "binance")]
        exchange: String,
    },

    /// Recompute pattern records from stored period summaries
    Recompute {
        /// Symbol to recompute; all active symbols when omitted
        #[arg(short, long)]
        symbol: Option<String>,

        /// Granularity to recompute (day, week, month); all when omitted
        #[arg(short, long)]
        granularity: Option<Granularity>,

        /// Only recompute anchors at/after this local date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Show store counts per symbol and granularity
    Status {
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Run data quality checks and log findings
    QualityCheck {
        #[arg(short, long)]
        symbol: Option<String>,
    },
}

pub async fn execute(command: Commands, config: EngineConfig) -> Result<()> {
    let calendar = Calendar::new(&config)?;
    let store = PostgresStore::connect(&config.database_url, 8)
        .await
        .context("failed to connect to the period store")?;

    match command {
        Commands::InitDb => {
            store.init_schema().await?;
            for entry in &config.symbols {
                store
                    .upsert_symbol(&Symbol {
                        name: entry.name.clone(),
                        display_name: entry.display_name.clone(),
                        exchange: entry.exchange.clone(),
                        active: true,
                    })
                    .await?;
            }
            info!(symbols = config.symbols.len(), "database initialized");
        }

        Commands::Import {
            file,
            symbol,
            exchange,
        } => {
            let bars = read_bars_csv(&file, &symbol)
                .with_context(|| format!("failed to read bars from {}", file.display()))?;
            info!(symbol, bars = bars.len(), "bars loaded");

            store
                .upsert_symbol(&Symbol {
                    name: symbol.clone(),
                    display_name: None,
                    exchange,
                    active: true,
                })
                .await?;

            let driver = RecomputeDriver::new(&store, calendar, config.clone());
            for granularity in Granularity::all() {
                let written = driver.ingest_bars(&symbol, granularity, &bars).await?;
                println!("{symbol}/{granularity}: {written} summaries written");
            }
        }

        Commands::Recompute {
            symbol,
            granularity,
            since,
        } => {
            let since = since.map(|date| calendar.day_start_on(date));
            let symbols = resolve_symbols(&store, symbol).await?;
            let granularities = match granularity {
                Some(g) => vec![g],
                None => Granularity::all().to_vec(),
            };

            let driver = RecomputeDriver::new(&store, calendar, config.clone());
            for name in &symbols {
                for g in &granularities {
                    let job = RecomputeJob::new(name.clone(), *g, since);
                    let outcome = driver.run(&job).await?;
                    println!(
                        "{job}: {} inserted, {} updated, {} skipped",
                        outcome.inserted, outcome.updated, outcome.skipped
                    );
                }
            }
        }

        Commands::Status { symbol } => {
            let symbols = resolve_symbols(&store, symbol).await?;
            for name in &symbols {
                println!("{name}:");
                for g in Granularity::all() {
                    let summaries = store.count_summaries(name, g).await?;
                    let patterns = store.count_pattern_records(name, g).await?;
                    let low_quality = store
                        .count_low_quality_summaries(name, g, config.quality_warn_threshold)
                        .await?;
                    println!(
                        "  {g}: {summaries} summaries, {patterns} pattern records, {low_quality} low quality"
                    );
                }
            }
        }

        Commands::QualityCheck { symbol } => {
            let symbols = resolve_symbols(&store, symbol).await?;
            let driver = RecomputeDriver::new(&store, calendar, config.clone());
            for name in &symbols {
                let affected = driver.run_quality_checks(name).await?;
                println!("{name}: {affected} low quality summaries");
            }
        }
    }

    Ok(())
}

async fn resolve_symbols(store: &PostgresStore, symbol: Option<String>) -> Result<Vec<String>> {
    let known: Vec<String> = store
        .active_symbols()
        .await?
        .into_iter()
        .map(|s| s.name)
        .collect();

    match symbol {
        Some(name) if known.contains(&name) => Ok(vec![name]),
        Some(name) => Err(EngineError::UnknownSymbol(name).into()),
        None => Ok(known),
    }
}

#[derive(Debug, Deserialize)]
struct BarRow {
    open_time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

fn read_bars_csv(path: &Path, symbol: &str) -> Result<Vec<RawBar>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();

    for row in reader.deserialize::<BarRow>() {
        let row = row?;
        let open_time = DateTime::<Utc>::from_timestamp_millis(row.open_time)
            .with_context(|| format!("open_time out of range: {}", row.open_time))?;
        bars.push(RawBar {
            symbol: symbol.to_string(),
            open_time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(bars)
}
