use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Where a population run reads its corpus XML from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// An in-memory XML document.
    Xml(String),
    /// A single corpus file on disk.
    File(PathBuf),
    /// Several corpus files, read in order and committed together.
    Files(Vec<PathBuf>),
}

impl CorpusSource {
    #[must_use]
    pub fn files(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::Files(paths.into_iter().collect())
    }

    /// Identifier recorded in the import log.
    #[must_use]
    pub fn uri(&self) -> String {
        match self {
            Self::Xml(_) => "inline".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Files(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl std::fmt::Display for CorpusSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLog {
    pub id: Uuid,
    pub source_uri: String,
    pub imported_at: DateTime<Utc>,
    pub entity_count: u64,
    pub association_count: u64,
}

impl ImportLog {
    #[must_use]
    pub fn new(source_uri: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            source_uri,
            imported_at: Utc::now(),
            entity_count: 0,
            association_count: 0,
        }
    }

    #[must_use]
    pub fn with_counts(mut self, entities: u64, associations: u64) -> Self {
        self.entity_count = entities;
        self.association_count = associations;
        self
    }
}
