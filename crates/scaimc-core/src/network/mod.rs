mod client;
mod config;
mod fetch;

pub use client::{CorpusClient, FetchError, FetchResult};
pub use config::NetworkConfig;
pub use fetch::{CorpusFetcher, CorpusFiles};
