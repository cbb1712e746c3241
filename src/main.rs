use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ev_registry::{load_dataset, logging, persist_dataset, CarRepository, Config};

/// Load the Washington State EV population JSON export into the registry database
#[derive(Parser, Debug)]
#[command(name = "ev-loader", version, about)]
struct Cli {
    /// Path to the dataset JSON file
    filename: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let config = Config::load().context("Failed to load configuration")?;

    println!("🔌 EV Registry - Dataset Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Reconcile the file
    println!("\n📂 Reading {}...", cli.filename.display());
    let mut dataset = load_dataset(&cli.filename)?;
    let (makes, models, cars) = dataset.counts();
    println!("Processed {} makes, {} models, and {} cars.", makes, models, cars);
    if dataset.stats.duplicate_cars > 0 {
        println!("✓ Dropped {} duplicate car rows", dataset.stats.duplicate_cars);
    }

    // 2. Open database
    println!("\n🔧 Opening database {}...", config.database.path.display());
    let repo = CarRepository::open(&config.database.path).with_context(|| {
        format!("Failed to open database: {}", config.database.path.display())
    })?;
    println!("✓ Database ready (WAL mode)");

    // 3. Persist
    println!("\n💾 Inserting cars...");
    let summary = persist_dataset(&repo, &mut dataset).context("Failed to persist dataset")?;
    println!("✓ Inserted: {} cars", summary.cars_inserted);
    println!("✓ Skipped duplicates: {}", summary.cars_skipped);
    println!("✓ Models: {}  Makes: {}", summary.models, summary.makes);

    Ok(())
}
