use serde::{Deserialize, Serialize};

/// HTTP settings used when fetching the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u32,
    /// Request timeout in seconds (covers the whole body download)
    pub request_timeout_seconds: u32,
    /// User agent to send (crate name and version by default)
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 30,
            request_timeout_seconds: 600,
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        })
    }
}
