use std::path::Path;

use anyhow::Result;
use console::style;
use scaimc_core::Config;

use super::{open_store, ExportFormat};

pub async fn run(config: &Config, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let store = open_store(config).await?;
    let graph = store.to_bel_graph().await?;

    let rendered = match format {
        ExportFormat::Bel => graph.to_bel_script()?,
        ExportFormat::Json => graph.to_json()?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            eprintln!(
                "{} Wrote {} nodes and {} edges to {}",
                style("●").green(),
                graph.node_count(),
                graph.edge_count(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
