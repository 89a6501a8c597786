use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::network::NetworkConfig;

pub const MODULE_NAME: &str = "scaimc";

pub const TRAIN_DATA_URL: &str = "https://www.scai.fraunhofer.de/content/dam/scai/de/downloads/bioinformatik/miRNA/miRNA-Train-Corpus.xml";
pub const TEST_DATA_URL: &str = "https://www.scai.fraunhofer.de/content/dam/scai/de/downloads/bioinformatik/miRNA/miRNA-Test-Corpus.xml";

const TRAIN_FILE_NAME: &str = "miRNA-Train-Corpus.xml";
const TEST_FILE_NAME: &str = "miRNA-Test-Corpus.xml";
const DATABASE_FILE_NAME: &str = "scaimc.db";

/// Locations and switches for a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the cached corpus files and the default database
    pub data_dir: PathBuf,
    pub train_url: String,
    pub test_url: String,
    /// Re-download the corpus even when cached copies exist
    pub force_download: bool,
    /// SQLite database path; defaults to `data_dir/scaimc.db`
    pub database: Option<PathBuf>,
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            train_url: TRAIN_DATA_URL.to_string(),
            test_url: TEST_DATA_URL.to_string(),
            force_download: false,
            database: None,
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `SCAIMC_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("SCAIMC_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("SCAIMC_TRAIN_URL") {
            self.train_url = url;
        }
        if let Some(url) = lookup("SCAIMC_TEST_URL") {
            self.test_url = url;
        }
        if let Some(db) = lookup("SCAIMC_DB") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(force) = lookup("SCAIMC_FORCE_DOWNLOAD") {
            self.force_download = force == "1" || force.eq_ignore_ascii_case("true");
        }
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: PathBuf) -> Self {
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn with_force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    #[must_use]
    pub fn train_path(&self) -> PathBuf {
        self.data_dir.join(TRAIN_FILE_NAME)
    }

    #[must_use]
    pub fn test_path(&self) -> PathBuf {
        self.data_dir.join(TEST_FILE_NAME)
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILE_NAME))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bio2bel")
        .join(MODULE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_paths_live_in_data_dir() {
        let config = Config::default().with_data_dir(PathBuf::from("/tmp/scaimc"));

        assert_eq!(config.train_path(), PathBuf::from("/tmp/scaimc/miRNA-Train-Corpus.xml"));
        assert_eq!(config.test_path(), PathBuf::from("/tmp/scaimc/miRNA-Test-Corpus.xml"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/scaimc/scaimc.db"));
        assert!(!config.force_download);
    }

    #[test]
    fn test_default_data_dir_is_module_scoped() {
        assert!(Config::default().data_dir.ends_with(".bio2bel/scaimc"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCAIMC_DATA_DIR", "/data"),
            ("SCAIMC_DB", "/db/corpus.db"),
            ("SCAIMC_FORCE_DOWNLOAD", "TRUE"),
            ("SCAIMC_TRAIN_URL", "http://localhost/train.xml"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().with_env(|k| env.get(k).map(ToString::to_string));

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.database_path(), PathBuf::from("/db/corpus.db"));
        assert!(config.force_download);
        assert_eq!(config.train_url, "http://localhost/train.xml");
        assert_eq!(config.test_url, TEST_DATA_URL);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config, parsed);
    }
}
