mod cli;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Download { force } => cli::download::run(config.with_force_download(force)).await,
        Commands::Populate {
            files,
            force_download,
            reset,
        } => cli::populate::run(config.with_force_download(force_download), &files, reset).await,
        Commands::Summarize => cli::summarize::run(&config).await,
        Commands::Export { format, output } => {
            cli::export::run(&config, format, output.as_deref()).await
        }
        Commands::Drop => cli::drop::run(&config).await,
    }
}
