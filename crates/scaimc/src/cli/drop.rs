use anyhow::Result;
use console::style;
use scaimc_core::Config;

use super::open_store;

pub async fn run(config: &Config) -> Result<()> {
    let mut store = open_store(config).await?;
    store.drop_all().await?;

    eprintln!(
        "{} Dropped tables in {}",
        style("●").green(),
        config.database_path().display()
    );

    Ok(())
}
