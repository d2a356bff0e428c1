use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_COLLECTION: &str = "proyectos";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub firestore: FirestoreConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreConfig {
  pub project_id: String,
  /// REST endpoint root, e.g. an emulator at http://localhost:8080/v1
  pub base_url: Option<String>,
  /// Documents requested per page
  pub page_size: Option<u32>,
  /// How often the push channel re-reads the collection
  pub poll_interval_secs: Option<u64>,
}

impl FirestoreConfig {
  pub fn base_url(&self) -> &str {
    self.base_url.as_deref().unwrap_or(DEFAULT_FIRESTORE_URL)
  }

  pub fn page_size(&self) -> u32 {
    self.page_size.unwrap_or(100).max(1)
  }

  pub fn poll_interval(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.poll_interval_secs.unwrap_or(30).max(1))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Collection holding one document per project
  #[serde(default = "default_collection")]
  pub collection: String,
  /// Seconds a fetched catalog stays fresh
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  /// Seconds before a fetch is abandoned in favor of the fallback catalog
  #[serde(default = "default_fetch_timeout_secs")]
  pub fetch_timeout_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      collection: default_collection(),
      ttl_secs: default_ttl_secs(),
      fetch_timeout_secs: default_fetch_timeout_secs(),
    }
  }
}

fn default_collection() -> String {
  DEFAULT_COLLECTION.to_string()
}

fn default_ttl_secs() -> u64 {
  crate::cache::DEFAULT_TTL_SECS as u64
}

fn default_fetch_timeout_secs() -> u64 {
  10
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for daily rolling log files (stderr only if unset)
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

const LOCAL_CONFIG: &str = "spark-projects.yaml";

impl Config {
  /// Load the configuration.
  ///
  /// An explicit path must exist. Without one, `./spark-projects.yaml` is
  /// tried before `$XDG_CONFIG_HOME/spark-projects/config.yaml`.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit_path {
      return Self::from_path(path);
    }

    let path = Self::candidate_paths()
      .into_iter()
      .find(|path| path.is_file())
      .ok_or_else(|| {
        eyre!(
          "No configuration found in ./{} or the user config directory; \
           `firestore.project_id` must be set in one of them",
          LOCAL_CONFIG
        )
      })?;
    Self::from_path(&path)
  }

  fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(config_dir) = dirs::config_dir() {
      paths.push(config_dir.join("spark-projects").join("config.yaml"));
    }
    paths
  }

  /// Read and validate one YAML file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Cannot read config {}: {}", path.display(), e))?;
    Self::from_yaml(&contents).map_err(|e| eyre!("Invalid config {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.firestore.project_id.trim().is_empty() {
      return Err(eyre!("firestore.project_id must not be empty"));
    }
    Ok(config)
  }

  /// Get the Firestore API key from environment variables.
  ///
  /// Checks SPARK_FIRESTORE_API_KEY first, then FIRESTORE_API_KEY. Public
  /// collections can be read without one.
  pub fn get_api_key() -> Option<String> {
    std::env::var("SPARK_FIRESTORE_API_KEY")
      .or_else(|_| std::env::var("FIRESTORE_API_KEY"))
      .ok()
      .filter(|key| !key.is_empty())
  }
}
