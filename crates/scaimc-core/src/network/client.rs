use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::config::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Download of {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type FetchResult<T> = Result<T, FetchError>;

/// HTTP client for pulling corpus files
pub struct CorpusClient {
    config: NetworkConfig,
    inner: Client,
}

impl CorpusClient {
    pub fn new(config: NetworkConfig) -> FetchResult<Self> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self { config, inner })
    }

    fn validate_request(url: &str) -> FetchResult<Url> {
        let parsed = Url::parse(url)?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        if parsed.host_str().is_none() {
            return Err(FetchError::InvalidUrl("No host in URL".to_string()));
        }

        Ok(parsed)
    }

    pub async fn get(&self, url: &str) -> FetchResult<Response> {
        let parsed = Self::validate_request(url)?;

        let response = self.inner.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Download `url` into `dest`, replacing any existing file.
    ///
    /// The body is streamed into a `.part` sibling and renamed into place, so
    /// `dest` is never left truncated. The `.part` file is removed on failure.
    pub async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let partial = partial_path(dest);
        let result = stream_to(response, &partial, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

async fn stream_to(mut response: Response, partial: &Path, dest: &Path) -> FetchResult<u64> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| FetchError::Io { path, source }
    };

    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(io_err(partial))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(io_err(partial))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err(partial))?;
    drop(file);

    tokio::fs::rename(partial, dest)
        .await
        .map_err(io_err(dest))?;

    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
