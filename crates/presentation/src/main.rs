use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use presentation::picker::pick_event;
use presentation::{Cycler, PresentationConfig, Render, TerminalRenderer};
use storage::error_log::ErrorLogLayer;
use storage::models::event_ids;
use storage::{DatasetKind, DatasetStore, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "presentation")]
#[command(about = "Cycles live rankings of one event", long_about = None)]
#[command(version)]
struct Args {
    /// Event to show; asks interactively when omitted
    #[arg(long)]
    event: Option<String>,

    /// Seconds between reloads of the results
    #[arg(long, default_value_t = 180)]
    refresh: u64,

    /// Seconds each category stays on screen
    #[arg(long, default_value_t = 10)]
    cycle: u64,

    /// Lines per board
    #[arg(long, default_value_t = 20)]
    rows: usize,

    #[arg(long, env = "ROSTER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Print every category once and exit
    #[arg(long)]
    once: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut store_config = StoreConfig::from_env().context("Invalid storage configuration")?;
    if let Some(dir) = args.data_dir {
        store_config.data_dir = dir;
    }

    let log_level = if args.verbose { "debug" } else { "info" };
    let error_log = ErrorLogLayer::open(&store_config.error_log_path())
        .inspect_err(|e| eprintln!("error.log unavailable: {}", e))
        .ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("presentation={},storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(error_log)
        .init();

    let store = DatasetStore::new(store_config);

    let event = match args.event {
        Some(event) => event,
        None => {
            let picked = pick_event(&mut io::stdin().lock(), &mut io::stdout(), || {
                event_ids(&store.load(DatasetKind::Events))
            })
            .context("Failed to read the event choice")?;
            match picked {
                Some(event) => event,
                None => {
                    println!("No event selected.");
                    return Ok(());
                }
            }
        }
    };

    let config = PresentationConfig {
        event: Some(event),
        refresh: Duration::from_secs(args.refresh.max(1)),
        cycle: Duration::from_secs(args.cycle.max(1)),
        rows: args.rows,
    };
    let mut cycler = Cycler::new(config);

    if args.once {
        cycler
            .refresh(&store, Local::now().naive_local())
            .context("Failed to load results")?;
        let mut renderer = TerminalRenderer::new(io::stdout(), false);
        for _ in 0..cycler.category_count() {
            renderer.render(&cycler.board())?;
            cycler.advance();
        }
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    presentation::run(&mut cycler, &store, &mut TerminalRenderer::stdout(), shutdown).await;

    Ok(())
}
