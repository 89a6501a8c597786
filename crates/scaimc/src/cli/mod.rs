pub mod download;
pub mod drop;
pub mod export;
pub mod populate;
pub mod summarize;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use scaimc_core::Config;

#[derive(Parser)]
#[command(
    name = "scaimc",
    about = "Convert the SCAI miRNA-disease corpus to a database and BEL",
    version
)]
pub struct Cli {
    /// SQLite database path (defaults to <data-dir>/scaimc.db)
    #[arg(long, global = true, env = "SCAIMC_DB")]
    pub db: Option<PathBuf>,
    /// Directory for cached corpus files
    #[arg(long = "data-dir", global = true, env = "SCAIMC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Environment defaults with command-line overrides applied.
    pub fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir.clone());
        }
        if let Some(db) = &self.db {
            config = config.with_database(db.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the train and test corpus files if missing
    Download {
        /// Download again even if cached copies exist
        #[arg(short, long)]
        force: bool,
    },
    /// Load the corpus into the database
    Populate {
        /// Corpus XML file(s) to load instead of the downloaded corpus
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Download again even if cached copies exist
        #[arg(long = "force-download")]
        force_download: bool,
        /// Drop existing data before loading
        #[arg(long)]
        reset: bool,
    },
    /// Show entity and association counts
    Summarize,
    /// Export stored associations as a graph
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Bel)]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drop all tables
    Drop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Bel,
    Json,
}

/// Open the configured database, creating its directory if needed.
pub async fn open_store(config: &Config) -> anyhow::Result<scaimc_core::UpsertStore> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(scaimc_core::UpsertStore::open(&path.to_string_lossy()).await?)
}
