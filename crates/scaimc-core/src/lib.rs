pub mod association;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod network;
pub mod source;
pub mod storage;
pub mod store;

pub use association::AssociationRecord;
pub use config::Config;
pub use entity::{CharOffsets, EntityKind, EntityRecord, EntityRef};
pub use error::{Error, Result};
pub use graph::{to_graph, BelEdge, BelGraph, BelNode};
pub use ingest::{
    extract_pairs, EntityMention, IngestError, IngestPipeline, IngestStats, ParseError, RawPairRow,
};
pub use network::{CorpusFetcher, CorpusFiles, FetchError, NetworkConfig};
pub use source::{CorpusSource, ImportLog};
pub use storage::Storage;
pub use store::{CommitSummary, Resolution, Summary, UpsertStore};
