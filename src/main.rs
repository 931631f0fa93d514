use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use covisit::config::load_config;
use covisit::engine::SequencingEngine;
use covisit::model::destination::DestinationId;
use covisit::query::{DayOptions, ItineraryOptions, SuggestOptions};
use covisit::server::run_http_server;

/// covisit: next-place suggestions, day plans and itineraries from visit history
#[derive(Parser)]
#[command(name = "covisit")]
#[command(
    about = "Co-visitation graph engine. Learns which places people visit one after another and plans days and trips from it."
)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "COVISIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Train a graph in the background on startup
        #[arg(long)]
        train: bool,
    },
    /// Build the graph from visit history and persist it
    Train {
        /// Minimum edge weight to keep
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        min_weight: Option<u32>,
        /// Days of visit history to use
        #[arg(long, value_parser = clap::value_parser!(u32).range(30..=365))]
        days: Option<u32>,
    },
    /// Suggest places to visit after a destination
    Suggest {
        /// Current destination id
        #[arg(short, long)]
        destination: DestinationId,
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
        limit: u32,
        /// Destination ids to leave out (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<DestinationId>,
        /// Maximum distance in km; 0 disables the distance filter
        #[arg(long, default_value = "10", value_parser = parse_distance_km)]
        max_distance_km: f64,
    },
    /// Compose a day starting from a destination
    Day {
        /// Starting destination id
        #[arg(short, long)]
        start: DestinationId,
        /// Preferred categories (comma-separated)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(2..=10))]
        max_places: u32,
    },
    /// Split destinations into a multi-day itinerary
    Itinerary {
        /// Destination ids (comma-separated)
        #[arg(value_delimiter = ',', required = true)]
        destinations: Vec<DestinationId>,
        #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=7))]
        max_days: u32,
    },
    /// Show graph status
    Status,
}

fn parse_distance_km(raw: &str) -> Result<f64, String> {
    let km: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if km.is_nan() || km < 0.0 {
        return Err(format!("must be a non-negative number, got {raw}"));
    }
    Ok(km)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "covisit=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so command output on stdout stays machine-readable.
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the persisted graph, training one if the store has none.
async fn prepare_graph(engine: &SequencingEngine) -> anyhow::Result<()> {
    if engine.load_graph().await {
        return Ok(());
    }
    warn!("No persisted graph; training from visit history");
    let report = engine.train(None, None).await?;
    info!(outcome = ?report.outcome, "Training finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(config.logging.json);

    let engine = Arc::new(
        SequencingEngine::from_config(&config)
            .await
            .context("failed to initialise sequencing engine")?,
    );

    match cli.command {
        Commands::Serve { train } => {
            if train {
                let worker = engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = worker.train(None, None).await {
                        error!(error = %e, "Startup training failed");
                    }
                });
            }
            run_http_server(&config.server, engine).await?;
        }
        Commands::Train { min_weight, days } => {
            let report = engine.train(min_weight, days).await?;
            print_json(&report)?;
        }
        Commands::Suggest {
            destination,
            limit,
            exclude,
            max_distance_km,
        } => {
            prepare_graph(&engine).await?;
            let options = SuggestOptions {
                limit: limit as usize,
                exclude: exclude.into_iter().collect(),
                consider_distance: max_distance_km > 0.0,
                max_distance_km,
            };
            let suggestions = engine.suggest_next_places(destination, &options).await?;
            print_json(&suggestions)?;
        }
        Commands::Day {
            start,
            categories,
            max_places,
        } => {
            prepare_graph(&engine).await?;
            let options = DayOptions {
                categories: (!categories.is_empty()).then_some(categories),
                max_places: max_places as usize,
            };
            let day = engine.suggest_complete_day(start, &options).await?;
            print_json(&day)?;
        }
        Commands::Itinerary {
            destinations,
            max_days,
        } => {
            prepare_graph(&engine).await?;
            let itinerary = engine
                .optimize_itinerary(
                    &destinations,
                    &ItineraryOptions {
                        max_days: max_days as usize,
                    },
                )
                .await?;
            print_json(&itinerary)?;
        }
        Commands::Status => {
            print_json(&engine.status().await)?;
        }
    }

    Ok(())
}
