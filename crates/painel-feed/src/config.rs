use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use painel_bridge::config::Config;
use tokio::{
    fs::{OpenOptions, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};

/// Environment variable overriding the location of `config.toml`.
pub const CONFIG_PATH_VARIABLE: &str = "PAINEL_CONFIG";
/// Environment variable overriding the signed-in user id.
pub const USER_ID_VARIABLE: &str = "PAINEL_USER_ID";

/// Errors that can occur while loading or resolving application configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to determine the user's configuration directory. This usually
    /// occurs when required environment variables are missing (e.g., `$HOME`
    /// on Unix or `%APPDATA%` on Windows).
    #[error("failed to obtain user's directories")]
    DirectoriesNotFound,
    /// An I/O error occurred while reading or writing the configuration file.
    #[error("failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid TOML or does not match the expected structure.
    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
    /// Failed to serialize the default configuration to TOML.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    match ProjectDirs::from("br", "painel", "painel") {
        Some(path) => Ok(path.config_dir().join("config.toml")),
        None => Err(ConfigError::DirectoriesNotFound),
    }
}

/// Resolves the configuration file path, honouring [`CONFIG_PATH_VARIABLE`].
pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    match std::env::var_os(CONFIG_PATH_VARIABLE) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => default_config_path(),
    }
}

/// Loads the application configuration from its resolved location and applies
/// environment overrides.
pub async fn load_config() -> Result<Config, ConfigError> {
    let config_path = resolve_config_path()?;
    let config = load_config_from(&config_path).await?;
    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Loads the configuration stored at `config_path`. When the file does not
/// exist yet, the default configuration is written there and returned.
pub async fn load_config_from(config_path: &Path) -> Result<Config, ConfigError> {
    log::info!("Loading configuration from {config_path:?}");
    if config_path.exists() {
        let contents = read_to_string(config_path).await?;
        let config: Config = toml::from_str(&contents)?;
        return Ok(config);
    }

    let config = Config::default();
    if let Some(parent) = config_path.parent() {
        create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(&config)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(config_path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(config)
}

/// Applies overrides looked up through `lookup` (normally the process
/// environment). Blank values are ignored.
pub fn apply_env_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(user_id) = lookup(USER_ID_VARIABLE) {
        let user_id = user_id.trim();
        if !user_id.is_empty() {
            config.user_id = Some(user_id.to_string());
        }
    }
    config
}
