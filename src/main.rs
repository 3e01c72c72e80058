mod catalog;
mod config;
mod dialog;
mod error;
mod models;
mod nlu;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::CatalogService;
use crate::config::AppConfig;
use crate::dialog::{MainDialog, Presenter, TurnOutcome};
use crate::models::{FilterCriteria, Shoe, PRICE_UNKNOWN};
use crate::nlu::CluRecognizer;
use crate::scraper::HeatMvmntScraper;
use crate::storage::{CsvSnapshotStore, SnapshotStore};

#[derive(Parser)]
#[command(name = "release-radar", about = "Sneaker release catalog bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat session on stdin
    Chat,

    /// Refresh the catalog now and update the durable snapshot
    Refresh,

    /// One-shot filtered catalog query
    Show {
        /// Brand substring to match (case-insensitive)
        #[arg(long)]
        brand: Option<String>,

        /// Lower price bound in euro
        #[arg(long)]
        min_price: Option<f64>,

        /// Upper price bound in euro
        #[arg(long)]
        max_price: Option<f64>,
    },

    /// Durable snapshot statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "release_radar=info,warn",
        1 => "release_radar=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Chat => {
            let catalog = build_catalog(&config)?;
            let recognizer = CluRecognizer::new(&config.nlu)?;
            run_chat(catalog, recognizer).await?;
        }

        Command::Refresh => {
            let _t = utils::Timer::start("Catalog refresh");
            let catalog = build_catalog(&config)?;
            let n = catalog
                .force_refresh(&CancellationToken::new())
                .await
                .context("Catalog refresh failed")?;
            info!("Done: {} records in snapshot", n);
        }

        Command::Show {
            brand,
            min_price,
            max_price,
        } => {
            let catalog = build_catalog(&config)?;
            let criteria = FilterCriteria {
                brand,
                min_price,
                max_price,
            };
            let shoes = catalog
                .filtered(&criteria, &CancellationToken::new())
                .await
                .context("Catalog query failed")?;

            if shoes.is_empty() {
                println!("No matching releases.");
            } else {
                for shoe in &shoes {
                    print_card(shoe);
                }
                println!("{} releases.", shoes.len());
            }
        }

        Command::Stats => {
            let store = CsvSnapshotStore::new(&config.catalog.snapshot_path);
            let shoes = store.load().context("Snapshot load failed")?;
            let age = std::fs::metadata(store.path())
                .and_then(|m| m.modified())
                .ok()
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t))
                .map(|t| utils::fmt_age(chrono::Utc::now() - t));

            println!("─────────────────────────────────");
            println!("  release-radar — Snapshot Stats");
            println!("─────────────────────────────────");
            println!("  File     : {:?}", store.path());
            println!("  Records  : {}", shoes.len());
            println!("  Priced   : {}", shoes.iter().filter(|s| s.has_price()).count());
            println!("  Age      : {}", age.unwrap_or_else(|| "—".into()));
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

fn build_catalog(config: &AppConfig) -> Result<Arc<CatalogService>> {
    let scraper = HeatMvmntScraper::new(&config.scraper).context("Failed to build scraper")?;
    let store = CsvSnapshotStore::new(&config.catalog.snapshot_path);
    Ok(Arc::new(CatalogService::new(
        Arc::new(scraper),
        Arc::new(store),
        config.catalog.refresh_interval_secs,
    )))
}

// ── Chat session ──────────────────────────────────────────────────────────────

struct CliPresenter;

impl Presenter for CliPresenter {
    fn say(&mut self, text: &str) {
        println!("{}", text);
    }

    fn show_shoes(&mut self, shoes: &[Shoe]) {
        for shoe in shoes {
            print_card(shoe);
        }
    }
}

fn print_card(shoe: &Shoe) {
    let price = if shoe.price_text == PRICE_UNKNOWN {
        "N/A"
    } else {
        shoe.price_text.as_str()
    };
    let release = if shoe.release_text.is_empty() {
        "N/A"
    } else {
        shoe.release_text.as_str()
    };

    println!("─────────────────────────────────");
    println!("  {}", shoe.name);
    println!("  Release : {}", release);
    println!("  Prezzo  : {}", price);
    if !shoe.image_url.is_empty() {
        println!("  Img     : {}", shoe.image_url);
    }
}

async fn run_chat(catalog: Arc<CatalogService>, recognizer: CluRecognizer) -> Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut dialog = MainDialog::new(recognizer, catalog);
    let mut presenter = CliPresenter;

    if dialog.start(&mut presenter, None) == TurnOutcome::Ended {
        return Ok(());
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = cancel.cancelled() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break; // stdin closed
        };
        if line.trim().is_empty() {
            continue;
        }

        if dialog.handle(&line, &mut presenter, &cancel).await == TurnOutcome::Ended {
            break;
        }
    }

    Ok(())
}
