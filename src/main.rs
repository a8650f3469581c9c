mod analysis;
mod db;
mod error;
mod logging;
mod models;
mod run;
mod transfer;
mod ui;

use anyhow::{Context, Result};
use std::path::PathBuf;

const DB_ENV_VAR: &str = "BILLS_ANALYZER_DB";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_dir = get_data_dir()?;
    logging::init(&data_dir);

    let db_path = get_db_path(&data_dir);
    tracing::info!(db = %db_path.display(), "starting bills-analyzer");
    let mut db = db::Database::open(&db_path)?;

    match args.len() {
        1 => run::as_tui(&mut db),
        2.. => run::as_cli(&args, &mut db),
        _ => {
            eprintln!("Usage: bills-analyzer [command]");
            Ok(())
        }
    }
}

fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "bills-analyzer", "BillsAnalyzer")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.to_path_buf())
}

fn get_db_path(data_dir: &std::path::Path) -> PathBuf {
    std::env::var(DB_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(|p| PathBuf::from(run::shellexpand(&p)))
        .unwrap_or_else(|| data_dir.join("bills-analyzer.db"))
}
