use std::path::PathBuf;

use anyhow::Result;
use console::style;
use scaimc_core::{Config, CorpusSource, IngestPipeline, IngestStats};

use super::open_store;

pub async fn run(config: Config, files: &[PathBuf], reset: bool) -> Result<()> {
    let mut store = open_store(&config).await?;

    if !reset && store.is_populated().await? {
        eprintln!(
            "{} Database already populated at {}",
            style("○").dim(),
            config.database_path().display()
        );
        eprintln!("  Run 'scaimc populate --reset' to reload it");
        return Ok(());
    }

    // --reset deletes the old rows in the same transaction that writes the new ones.
    let stats = if files.is_empty() {
        let mut pipeline = IngestPipeline::with_store(config, store)?;
        if reset {
            pipeline.reload().await?
        } else {
            pipeline.run().await?
        }
    } else {
        let source = CorpusSource::files(files.iter().cloned());
        if reset {
            store.repopulate(&source).await?
        } else {
            store.populate(&source).await?
        }
    };

    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &IngestStats) {
    eprintln!("{} Populated", style("●").green());
    eprintln!("  Pairs: {}", stats.rows);
    eprintln!("  New entities: {}", stats.new_entities);
    if stats.matched_entities > 0 {
        eprintln!("  Matched entities: {}", stats.matched_entities);
    }
    eprintln!("  Associations: {}", stats.new_associations);
    eprintln!("  Took: {}ms", stats.duration_ms);
}
