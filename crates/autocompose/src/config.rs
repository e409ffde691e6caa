//! Configuration loading for AutoCompose.
//!
//! Values are resolved in order (later wins):
//! 1. Compiled defaults
//! 2. Config file (`--config` path, else `./autocompose.toml`, else
//!    `~/.config/autocompose/config.toml`)
//! 3. Environment variables (`AUTOCOMPOSE_*`)
//! 4. CLI flags (applied by `main`)

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config file that was loaded, if any
    pub file: Option<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// host:port the HTTP server binds
    pub listen_addr: String,
    /// Directory compositions are written under
    pub output_root: PathBuf,
    pub composer: ComposerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: "127.0.0.1:8000".to_string(),
            output_root: PathBuf::from("./output"),
            composer: ComposerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            api_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model: composer::DEFAULT_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the discovered file, then the environment.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = AppConfig::default();

        if let Some(path) = discover_config_file(cli_path) {
            config = load_from_file(&path)?;
            sources.file = Some(path);
        }

        apply_env_overrides(&mut config, &mut sources);
        Ok((config, sources))
    }
}

/// Find the config file to load, if any.
///
/// An explicit CLI path always wins, and missing is an error at load time.
/// Discovered locations are only used when they exist.
pub fn discover_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from("autocompose.toml");
    if local.exists() {
        return Some(local);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("autocompose/config.toml");
        if user.exists() {
            return Some(user);
        }
    }

    None
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string.
fn parse_toml(contents: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut config = AppConfig::default();

    if let Some(v) = table.get("listen_addr").and_then(|v| v.as_str()) {
        config.listen_addr = v.to_string();
    }
    if let Some(v) = table.get("output_root").and_then(|v| v.as_str()) {
        config.output_root = expand_path(v);
    }

    if let Some(composer) = table.get("composer").and_then(|v| v.as_table()) {
        if let Some(v) = composer.get("api_url").and_then(|v| v.as_str()) {
            config.composer.api_url = v.to_string();
        }
        if let Some(v) = composer.get("api_key").and_then(|v| v.as_str()) {
            config.composer.api_key = v.to_string();
        }
        if let Some(v) = composer.get("model").and_then(|v| v.as_str()) {
            config.composer.model = v.to_string();
        }
    }

    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut AppConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("AUTOCOMPOSE_LISTEN_ADDR") {
        config.listen_addr = v;
        sources
            .env_overrides
            .push("AUTOCOMPOSE_LISTEN_ADDR".to_string());
    }
    if let Ok(v) = env::var("AUTOCOMPOSE_OUTPUT_ROOT") {
        config.output_root = expand_path(&v);
        sources
            .env_overrides
            .push("AUTOCOMPOSE_OUTPUT_ROOT".to_string());
    }
    if let Ok(v) = env::var("AUTOCOMPOSE_API_URL") {
        config.composer.api_url = v;
        sources.env_overrides.push("AUTOCOMPOSE_API_URL".to_string());
    }
    // Also support the standard provider variable
    if let Ok(v) = env::var("ANTHROPIC_API_KEY") {
        config.composer.api_key = v;
        sources.env_overrides.push("ANTHROPIC_API_KEY".to_string());
    }
    if let Ok(v) = env::var("AUTOCOMPOSE_API_KEY") {
        config.composer.api_key = v;
        sources.env_overrides.push("AUTOCOMPOSE_API_KEY".to_string());
    }
    if let Ok(v) = env::var("AUTOCOMPOSE_MODEL") {
        config.composer.model = v;
        sources.env_overrides.push("AUTOCOMPOSE_MODEL".to_string());
    }
}

/// Expand a leading ~ in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
