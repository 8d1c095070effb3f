//! Configuration management for mirror.
//!
//! Parses `mirror.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `notion.token`
//! - `notion.base_url`
//! - `notion.version`
//! - `pages[].id`
//! - `databases[].id`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mirror.toml";

/// Environment variable consulted when `notion.token` is empty.
pub const TOKEN_ENV_VAR: &str = "NOTION_TOKEN";

/// Upper bound for `sync.max_attempts`.
const MAX_ATTEMPTS_LIMIT: u32 = 20;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Force full reconciliation.
    pub full: Option<bool>,
    /// Fetch nested blocks for every database row.
    pub fetch_row_blocks: Option<bool>,
    /// Override the snapshot output directory.
    pub output_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notion API configuration.
    pub notion: NotionConfig,
    /// Output layout (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Sync behaviour.
    pub sync: SyncConfig,
    /// Standalone pages to mirror.
    pub pages: Vec<PageEntry>,
    /// Databases to mirror.
    pub databases: Vec<DatabaseEntry>,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Notion API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Integration token. Empty means "fall back to `NOTION_TOKEN`".
    pub token: String,
    /// API base URL.
    pub base_url: String,
    /// Value of the `Notion-Version` header.
    pub version: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: "https://api.notion.com".to_owned(),
            version: "2022-06-28".to_owned(),
        }
    }
}

/// Raw output configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    assets_dir: Option<String>,
    state_file: Option<String>,
}

/// Resolved output configuration with absolute paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Root directory for JSON snapshots.
    pub dir: PathBuf,
    /// Directory for downloaded assets.
    pub assets_dir: PathBuf,
    /// Durable sync state file.
    pub state_file: PathBuf,
}

impl OutputConfig {
    fn under(dir: PathBuf) -> Self {
        Self {
            assets_dir: dir.join("assets"),
            state_file: dir.join(".sync_state.json"),
            dir,
        }
    }
}

/// Sync behaviour configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts per remote call before giving up.
    pub max_attempts: u32,
    /// Fetch each database row's block tree (expensive).
    pub fetch_row_blocks: bool,
    /// Force full reconciliation on every run.
    pub full: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            fetch_row_blocks: false,
            full: false,
        }
    }
}

/// A standalone page to mirror.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Page identifier in any accepted form (raw, hyphenated, URL).
    #[serde(default)]
    pub id: Option<String>,
    /// Output alias; the snapshot is named after the id when absent.
    #[serde(default)]
    pub alias: Option<String>,
}

/// A database to mirror.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    /// Database identifier in any accepted form.
    #[serde(default)]
    pub id: Option<String>,
    /// Output name of the snapshot file.
    pub name: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`notion.token`").
        field: String,
        /// Error message (e.g., "${`NOTION_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
/// Snapshot file stem a target name maps to.
///
/// Mirrors the naming the sync engine applies, so that names which differ
/// only in case or punctuation are caught here instead of sharing one file.
fn output_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    match stem.trim_matches('-') {
        "" => "untitled".to_owned(),
        stem => stem.to_owned(),
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mirror.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(full) = settings.full {
            self.sync.full = full;
        }
        if let Some(fetch_row_blocks) = settings.fetch_row_blocks {
            self.sync.fetch_row_blocks = fetch_row_blocks;
        }
        if let Some(dir) = &settings.output_dir {
            let keep_assets = self.output.assets_dir.is_some();
            let keep_state = self.output.state_file.is_some();
            let defaults = OutputConfig::under(dir.clone());
            self.output_resolved.dir = defaults.dir;
            if !keep_assets {
                self.output_resolved.assets_dir = defaults.assets_dir;
            }
            if !keep_state {
                self.output_resolved.state_file = defaults.state_file;
            }
        }
    }

    /// Resolve the API token.
    ///
    /// The configured `notion.token` wins; otherwise `NOTION_TOKEN` from the
    /// environment is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when neither source provides a token.
    pub fn require_token(&self) -> Result<String, ConfigError> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }

    fn resolve_token_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        let configured = self.notion.token.trim();
        if !configured.is_empty() {
            return Ok(configured.to_owned());
        }
        lookup(TOKEN_ENV_VAR)
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "notion.token is not set and {TOKEN_ENV_VAR} is not in the environment"
                ))
            })
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            notion: NotionConfig::default(),
            output: OutputConfigRaw::default(),
            sync: SyncConfig::default(),
            pages: Vec::new(),
            databases: Vec::new(),
            output_resolved: OutputConfig::under(base.join("data")),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.notion.base_url, "notion.base_url")?;
        require_http_url(&self.notion.base_url, "notion.base_url")?;
        require_non_empty(&self.notion.version, "notion.version")?;

        if self.sync.max_attempts == 0 || self.sync.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::Validation(format!(
                "sync.max_attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}"
            )));
        }

        self.validate_targets()
    }

    /// Output names must be unique or snapshots would overwrite each other.
    fn validate_targets(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for database in &self.databases {
            require_non_empty(&database.name, "databases.name")?;
            if !names.insert(output_stem(&database.name)) {
                return Err(ConfigError::Validation(format!(
                    "duplicate database name '{}' (output file '{}.json' is already taken)",
                    database.name,
                    output_stem(&database.name)
                )));
            }
        }

        let mut aliases = HashSet::new();
        for alias in self.pages.iter().filter_map(|p| p.alias.as_deref()) {
            require_non_empty(alias, "pages.alias")?;
            if !aliases.insert(output_stem(alias)) {
                return Err(ConfigError::Validation(format!(
                    "duplicate page alias '{alias}' (output file '{}.json' is already taken)",
                    output_stem(alias)
                )));
            }
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.notion.token = expand::expand_env(&self.notion.token, "notion.token")?;
        self.notion.base_url = expand::expand_env(&self.notion.base_url, "notion.base_url")?;
        self.notion.version = expand::expand_env(&self.notion.version, "notion.version")?;

        for (i, page) in self.pages.iter_mut().enumerate() {
            page.id = expand::expand_optional(page.id.as_deref(), &format!("pages[{i}].id"))?;
        }
        for (i, database) in self.databases.iter_mut().enumerate() {
            database.id =
                expand::expand_optional(database.id.as_deref(), &format!("databases[{i}].id"))?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let dir = config_dir.join(self.output.dir.as_deref().unwrap_or("data"));
        let defaults = OutputConfig::under(dir);

        self.output_resolved = OutputConfig {
            assets_dir: self
                .output
                .assets_dir
                .as_deref()
                .map_or(defaults.assets_dir, |p| config_dir.join(p)),
            state_file: self
                .output
                .state_file
                .as_deref()
                .map_or(defaults.state_file, |p| config_dir.join(p)),
            dir: defaults.dir,
        };
    }
}
