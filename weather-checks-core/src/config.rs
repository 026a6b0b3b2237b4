use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Name of the directory that marks the project root. The config file and the
/// default database live inside it.
pub const MARKER_DIR: &str = "weather-checks";

/// File name of the configuration inside [`MARKER_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_CITIES_URL: &str = "https://countriesnow.space/api/v0.1/countries/cities";
pub const DEFAULT_COMPLETION_URL: &str = "https://www.timeanddate.com/scripts/completion.php";
pub const DEFAULT_SITE_URL: &str = "https://www.timeanddate.com";
pub const DEFAULT_DB_FILE: &str = "data.db";

/// Credentials and location of the current-weather endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,

    /// Optional `units` query parameter, e.g. "metric". Kelvin when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Endpoints used besides the weather API. Overridable so the clients can be
/// pointed at a local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub cities_url: String,
    pub completion_url: String,
    pub site_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            cities_url: DEFAULT_CITIES_URL.to_string(),
            completion_url: DEFAULT_COMPLETION_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Relative paths are resolved against the marker directory.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_DB_FILE) }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [api]
/// base_url = "https://api.openweathermap.org/data/2.5/weather"
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory containing [`MARKER_DIR`]; set on load, never serialized.
    #[serde(skip)]
    root: PathBuf,
}

impl Config {
    /// Build a config rooted at `root` with default endpoints and database.
    pub fn new(root: impl Into<PathBuf>, base_url: String, api_key: String) -> Self {
        Self {
            api: ApiConfig { base_url, api_key, units: None },
            endpoints: EndpointsConfig::default(),
            database: DatabaseConfig::default(),
            root: root.into(),
        }
    }

    /// Walk up from `start` to the project root and load its config file.
    pub fn load(start: &Path) -> Result<Self> {
        let root = find_root_directory(start)?;
        Self::load_from_root(root)
    }

    /// Load the config file of an already-known project root.
    pub fn load_from_root(root: PathBuf) -> Result<Self> {
        let path = config_file_path(&root);

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if cfg.api.api_key.trim().is_empty() {
            return Err(anyhow!(
                "No API key configured in {}.\n\
                 Hint: run `weather-checks configure` and enter your API key.",
                path.display()
            ));
        }

        cfg.root = root;
        Ok(cfg)
    }

    /// Save config to disk, creating the marker directory if needed.
    pub fn save(&self) -> Result<()> {
        let path = self.config_file_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file_path(&self) -> PathBuf {
        config_file_path(&self.root)
    }

    /// Absolute path of the SQLite file.
    pub fn database_path(&self) -> PathBuf {
        if self.database.path.is_absolute() {
            self.database.path.clone()
        } else {
            self.root.join(MARKER_DIR).join(&self.database.path)
        }
    }
}

fn config_file_path(root: &Path) -> PathBuf {
    root.join(MARKER_DIR).join(CONFIG_FILE)
}

/// Walk up from `start` until a directory containing [`MARKER_DIR`] is found.
pub fn find_root_directory(start: &Path) -> Result<PathBuf> {
    let start = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to determine current directory")?
            .join(start)
    };

    start
        .ancestors()
        .find(|dir| dir.join(MARKER_DIR).is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            anyhow!(
                "Root directory containing '{MARKER_DIR}' not found above {}.",
                start.display()
            )
        })
}
