use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use editor::{DatasetTab, LogUi, Session, SessionConfig, TabView};
use storage::error_log::ErrorLogLayer;
use storage::models::NewCompetitor;
use storage::reconcile::reconcile;
use storage::store::read_recovery;
use storage::{DatasetKind, DatasetStore, IntegrityReport, StoreConfig, Table};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Competitor roster and results maintenance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding data.xlsx, eredmenyek.xlsx and versenyek.xlsx
    #[arg(long, env = "ROSTER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a dataset through the search filter
    Show {
        #[arg(value_parser = parse_dataset)]
        dataset: DatasetKind,

        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, default_value_t = editor::search::DEFAULT_ROW_LIMIT)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
    /// Register a competitor under the next free license number
    AddCompetitor {
        #[arg(long)]
        name: String,

        #[arg(long)]
        club: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        birth: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },
    /// Edit one cell with the same checks as the editor
    Set {
        #[arg(value_parser = parse_dataset)]
        dataset: DatasetKind,

        /// 1-based, as printed by `show`
        #[arg(long)]
        row: NonZeroUsize,

        #[arg(long)]
        column: String,

        #[arg(long)]
        value: String,

        /// Event used for empty Verseny_ID cells of result rows
        #[arg(long)]
        event: Option<String>,
    },
    /// Report problems already present in the data without changing it
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Restore a dataset from an autosave CSV
    Recover {
        #[arg(value_parser = parse_dataset)]
        dataset: DatasetKind,

        file: PathBuf,
    },
}

fn parse_dataset(s: &str) -> Result<DatasetKind, String> {
    s.parse::<DatasetKind>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env().context("Invalid storage configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let log_level = if cli.verbose { "debug" } else { "info" };
    let error_log = ErrorLogLayer::open(&config.error_log_path())
        .inspect_err(|e| eprintln!("error.log unavailable: {}", e))
        .ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "roster={},editor={},storage={}",
                    log_level, log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(error_log)
        .init();

    let store = DatasetStore::new(config);

    match cli.command {
        Commands::Show {
            dataset,
            search,
            limit,
            json,
        } => handle_show(&store, dataset, &search, limit, json)?,
        Commands::AddCompetitor {
            name,
            club,
            gender,
            birth,
            phone,
            email,
            comment,
        } => {
            let competitor = NewCompetitor {
                name,
                club,
                gender,
                birth,
                phone,
                email,
                comment,
            };
            handle_add_competitor(&store, competitor)?;
        }
        Commands::Set {
            dataset,
            row,
            column,
            value,
            event,
        } => handle_set(store, dataset, row, &column, &value, event).await?,
        Commands::Check { json } => handle_check(&store, json)?,
        Commands::Recover { dataset, file } => handle_recover(&store, dataset, file)?,
    }

    Ok(())
}

fn handle_show(
    store: &DatasetStore,
    kind: DatasetKind,
    search: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let config = SessionConfig {
        row_limit: limit,
        ..Default::default()
    };
    let mut tab = DatasetTab::new(kind, store.load(kind), &config);
    tab.set_query(search);
    let view = tab.view();

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

fn print_view(view: &TabView) {
    println!("#\t{}", view.columns.join("\t"));
    for (row, cells) in &view.rows {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        println!("{}\t{}", row + 1, cells.join("\t"));
    }
    println!("{} / {} rows", view.counts.visible, view.counts.total);
    if view.has_more {
        println!(
            "{} matching rows; raise --limit or refine --search to see the rest",
            view.matched_total
        );
    }
}

fn handle_add_competitor(store: &DatasetStore, competitor: NewCompetitor) -> anyhow::Result<()> {
    if let Err(errors) = competitor.validate() {
        bail!("Invalid competitor: {}", errors);
    }

    let mut table = store.load(DatasetKind::Competitors);
    let number = competitor
        .append_to(&mut table, Local::now().naive_local())
        .context("Cannot assign a license number")?;
    save_or_bail(store, DatasetKind::Competitors, &table)?;

    println!("Added {} with license number {}", competitor.name.trim(), number);
    Ok(())
}

async fn handle_set(
    store: DatasetStore,
    kind: DatasetKind,
    row: NonZeroUsize,
    column: &str,
    value: &str,
    event: Option<String>,
) -> anyhow::Result<()> {
    let (handle, task) = Session::spawn(Arc::new(store), SessionConfig::default(), LogUi);

    handle.select_event(event).await?;
    let outcome = handle.commit(kind, row.get() - 1, column, value).await;
    handle.close().await?;
    task.await.context("Editing session panicked")?;

    let committed = outcome?;
    if committed.changed {
        println!("Row {} updated", row);
    } else {
        println!("Row {} already had that value", row);
    }
    Ok(())
}

fn handle_check(store: &DatasetStore, json: bool) -> anyhow::Result<()> {
    let report = IntegrityReport::check(
        &store.load(DatasetKind::Competitors),
        &store.load(DatasetKind::Results),
        &store.load(DatasetKind::Events),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for warning in report.warnings() {
            println!("{}", warning);
        }
    }

    if !report.is_clean() {
        bail!("{} problem(s) found", report.warnings().len());
    }
    tracing::info!("✓ No integrity problems found");
    Ok(())
}

fn handle_recover(store: &DatasetStore, kind: DatasetKind, file: PathBuf) -> anyhow::Result<()> {
    let raw = read_recovery(&file)
        .with_context(|| format!("Failed to read recovery file {}", file.display()))?;
    let table = reconcile(raw, &kind.schema());
    save_or_bail(store, kind, &table)?;

    println!(
        "Restored {} rows of {} from {}",
        table.non_empty_rows().len(),
        kind,
        file.display()
    );
    Ok(())
}

/// Saves `table`, failing with the recovery copy's location if the save did not go through.
fn save_or_bail(store: &DatasetStore, kind: DatasetKind, table: &Table) -> anyhow::Result<()> {
    let report = store.save_or_recover(kind, table);
    if let Some(message) = report.failure_message(kind) {
        bail!(message);
    }
    Ok(())
}
