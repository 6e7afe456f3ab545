use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use common::gc::GcConfig;
use common::repo::{Repo, RepoError, BLOCKS_DIR, DATASTORE_DIR};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

pub const APP_NAME: &str = "pinstore";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write daily-rolling log files here in addition to stderr
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub gc: GcConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            gc: GcConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, StateError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the repo directory (~/.pinstore)
    pub repo_dir: PathBuf,
    pub blocks_path: PathBuf,
    pub datastore_path: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Get the repo directory path (custom or default ~/.pinstore)
    pub fn repo_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new repo directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let repo_dir = Self::repo_dir(custom_path)?;
        if repo_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let blocks_path = repo_dir.join(BLOCKS_DIR);
        let datastore_path = repo_dir.join(DATASTORE_DIR);
        fs::create_dir_all(&blocks_path)?;
        fs::create_dir_all(&datastore_path)?;

        let config = config.unwrap_or_default();
        config.level_filter()?;
        let config_path = repo_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            repo_dir,
            blocks_path,
            datastore_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the repo directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let repo_dir = Self::repo_dir(custom_path)?;
        let config_path = repo_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let blocks_path = repo_dir.join(BLOCKS_DIR);
        let datastore_path = repo_dir.join(DATASTORE_DIR);
        if !blocks_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOCKS_DIR)));
        }
        if !datastore_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", DATASTORE_DIR)));
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            repo_dir,
            blocks_path,
            datastore_path,
            config_path,
            config,
        })
    }

    pub async fn open_repo(&self) -> Result<Repo, RepoError> {
        Repo::open_fs(&self.repo_dir, self.config.gc.clone()).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("repo not initialized. Run 'pinstore init' first")]
    NotInitialized,

    #[error("repo already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
