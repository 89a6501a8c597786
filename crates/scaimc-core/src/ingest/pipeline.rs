use thiserror::Error;
use tracing::info;

use super::parser::ParseError;
use crate::config::Config;
use crate::network::{CorpusFetcher, CorpusFiles, FetchError};
use crate::source::CorpusSource;
use crate::store::UpsertStore;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Store error: {0}")]
    Store(#[from] crate::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Pair rows extracted from the corpus
    pub rows: usize,
    pub new_entities: usize,
    /// Entities already in the database before this run
    pub matched_entities: usize,
    pub new_associations: usize,
    pub duration_ms: u64,
}

impl IngestStats {
    #[must_use]
    pub fn total_entities(&self) -> usize {
        self.new_entities + self.matched_entities
    }
}

/// Fetch the corpus and load it into a store.
pub struct IngestPipeline {
    fetcher: CorpusFetcher,
    store: UpsertStore,
}

impl IngestPipeline {
    pub async fn new(config: Config) -> IngestResult<Self> {
        let db = config.database_path();
        if let Some(parent) = db.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let store = UpsertStore::open(&db.to_string_lossy()).await?;
        let fetcher = CorpusFetcher::new(config)?;

        Ok(Self { fetcher, store })
    }

    pub fn with_store(config: Config, store: UpsertStore) -> IngestResult<Self> {
        Ok(Self {
            fetcher: CorpusFetcher::new(config)?,
            store,
        })
    }

    pub fn store(&self) -> &UpsertStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut UpsertStore {
        &mut self.store
    }

    pub fn into_store(self) -> UpsertStore {
        self.store
    }

    pub async fn fetch(&self) -> IngestResult<CorpusFiles> {
        Ok(self.fetcher.ensure_corpus().await?)
    }

    /// Make sure the train and test files are present, then populate the
    /// store from both in a single commit. A fetch failure aborts before any
    /// parsing starts.
    pub async fn run(&mut self) -> IngestResult<IngestStats> {
        self.load(false).await
    }

    /// Like [`run`](Self::run), but the new corpus replaces whatever the
    /// store holds. Stored data is only touched once fetching and parsing
    /// have succeeded.
    pub async fn reload(&mut self) -> IngestResult<IngestStats> {
        self.load(true).await
    }

    async fn load(&mut self, replace: bool) -> IngestResult<IngestStats> {
        let files = self.fetch().await?;
        let source = CorpusSource::files(files.paths());

        let stats = if replace {
            self.store.repopulate(&source).await?
        } else {
            self.store.populate(&source).await?
        };

        info!(
            "loaded {} pairs into {} associations",
            stats.rows, stats.new_associations
        );

        Ok(stats)
    }
}
