use anyhow::Result;
use console::style;
use scaimc_core::{Config, CorpusFetcher};

pub async fn run(config: Config) -> Result<()> {
    let fetcher = CorpusFetcher::new(config)?;
    let files = fetcher.ensure_corpus().await?;

    eprintln!("{} Corpus ready", style("●").green());
    println!("{}", files.train.display());
    println!("{}", files.test.display());

    Ok(())
}
