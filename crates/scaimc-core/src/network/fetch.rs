use std::path::{Path, PathBuf};
use tracing::info;

use super::client::{CorpusClient, FetchError, FetchResult};
use crate::config::Config;

/// Local copies of the train and test corpus files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFiles {
    pub train: PathBuf,
    pub test: PathBuf,
}

impl CorpusFiles {
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        vec![self.train.clone(), self.test.clone()]
    }
}

/// Keeps the corpus files present on local storage.
pub struct CorpusFetcher {
    config: Config,
    client: CorpusClient,
}

impl CorpusFetcher {
    pub fn new(config: Config) -> FetchResult<Self> {
        let client = CorpusClient::new(config.network.clone())?;
        Ok(Self { config, client })
    }

    /// Return `dest`, downloading `url` into it first when it is missing or
    /// `force` is set. A cache hit performs no network access.
    pub async fn ensure_local(&self, url: &str, dest: &Path, force: bool) -> FetchResult<PathBuf> {
        let cached = tokio::fs::try_exists(dest)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        if !force && cached {
            info!("using cached data at {}", dest.display());
            return Ok(dest.to_path_buf());
        }

        info!("downloading {} to {}", url, dest.display());
        let bytes = self.client.download(url, dest).await?;
        info!("downloaded {} bytes to {}", bytes, dest.display());

        Ok(dest.to_path_buf())
    }

    /// Ensure both corpus files using the configured URLs, paths and
    /// `force_download` flag.
    pub async fn ensure_corpus(&self) -> FetchResult<CorpusFiles> {
        let force = self.config.force_download;

        info!("loading training data");
        let train = self
            .ensure_local(&self.config.train_url, &self.config.train_path(), force)
            .await?;

        info!("loading test data");
        let test = self
            .ensure_local(&self.config.test_url, &self.config.test_path(), force)
            .await?;

        Ok(CorpusFiles { train, test })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
