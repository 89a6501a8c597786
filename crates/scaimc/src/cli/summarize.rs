use anyhow::Result;
use scaimc_core::Config;

use super::open_store;

pub async fn run(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let summary = store.summary().await?;

    println!("mirnas: {}", summary.mirnas);
    println!("diseases_or_genes: {}", summary.diseases_or_genes);
    println!("associations: {}", summary.associations);

    if let Some(last) = store.storage().list_imports().await?.last() {
        eprintln!(
            "  Last import: {} from {}",
            last.imported_at.to_rfc3339(),
            last.source_uri
        );
    }

    Ok(())
}
