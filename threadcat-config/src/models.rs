use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use threadcat_core::query::QuerySettings;
use threadcat_core::store::{
    DEFAULT_CATALOG_FILE, DEFAULT_FAVORITES_FILE, DEFAULT_STATUS_FILE, DEFAULT_TAXONOMY_FILE,
    StorePaths,
};
use threadcat_core::sync::SyncSettings;

pub const CONFIG_PATH_ENV: &str = "THREADCAT_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "THREADCAT_CONFIG_JSON";
pub const DATA_DIR_ENV: &str = "THREADCAT_DATA_DIR";

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Where the four documents live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub catalog_file: String,
    pub favorites_file: String,
    pub taxonomy_file: String,
    pub status_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
            favorites_file: DEFAULT_FAVORITES_FILE.to_string(),
            taxonomy_file: DEFAULT_TAXONOMY_FILE.to_string(),
            status_file: DEFAULT_STATUS_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn paths(&self) -> StorePaths {
        StorePaths {
            catalog: self.data_dir.join(&self.catalog_file),
            favorites: self.data_dir.join(&self.favorites_file),
            taxonomy: self.data_dir.join(&self.taxonomy_file),
            status: self.data_dir.join(&self.status_file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chats synchronized concurrently in a batch run. Keep at 1 unless the
    /// remote tolerates parallel history walks.
    pub max_parallel_chats: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel_chats: 1,
        }
    }
}

/// Top-level threadcat configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncSettings,
    pub query: QuerySettings,
    pub batch: BatchConfig,
}

/// Loaded configuration plus how it was found.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub source: ConfigSource,
    pub env_file_loaded: bool,
}

impl Config {
    /// Reads `.env`, then resolves the configuration from the environment
    /// and validates it.
    pub fn load() -> anyhow::Result<ConfigLoad> {
        let env_file_loaded = dotenvy::dotenv().is_ok();
        let (mut config, source) = Self::load_from_env()?;
        if let Ok(dir) = env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.storage.data_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(ConfigLoad {
            config,
            source,
            env_file_loaded,
        })
    }

    /// Evaluation order:
    /// 1) `$THREADCAT_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$THREADCAT_CONFIG_JSON` (inline JSON),
    /// 3) `threadcat.toml`, `threadcat.json` or `config/threadcat.toml`,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw).context("failed to parse THREADCAT_CONFIG_JSON")?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid config {}", path.display())),
            Some("toml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid config {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Tries TOML first, then JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid config json: {err}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync.topic_page_size == 0 {
            bail!("sync.topic_page_size must be at least 1");
        }
        if self.batch.max_parallel_chats == 0 {
            bail!("batch.max_parallel_chats must be at least 1");
        }
        if self.sync.default_topic_label.trim().is_empty() {
            bail!("sync.default_topic_label must not be empty");
        }
        Ok(())
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["threadcat.toml", "threadcat.json", "config/threadcat.toml"];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}
