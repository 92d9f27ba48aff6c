use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::provider::{DodgeballConfig, DEFAULT_API_URL};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3020;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set (either directly, in the env file, or via RELAY_SECRETS_ARN)")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("Secrets error: {0}")]
    Secrets(String),
}

/// Process-wide configuration, read once at startup
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dodgeball_api_url: String,
    pub dodgeball_private_api_key: String,
    /// Passed through to the provider as the checkpoint `timeout` option
    pub checkpoint_timeout: Option<i64>,
    pub http_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dodgeball_api_url", &self.dodgeball_api_url)
            .field("dodgeball_private_api_key", &"<redacted>")
            .field("checkpoint_timeout", &self.checkpoint_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dodgeball_private_api_key = non_empty("DODGEBALL_PRIVATE_API_KEY")
            .ok_or(ConfigError::MissingVar("DODGEBALL_PRIVATE_API_KEY"))?;

        let dodgeball_api_url =
            non_empty("DODGEBALL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let checkpoint_timeout = non_empty("CHECKPOINT_TIMEOUT").and_then(|raw| {
            match raw.trim().parse::<i64>() {
                Ok(timeout) => Some(timeout),
                Err(_) => {
                    warn!(value = %raw, "Ignoring non-integer CHECKPOINT_TIMEOUT");
                    None
                }
            }
        });

        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let http_timeout_secs = match non_empty("DODGEBALL_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                name: "DODGEBALL_HTTP_TIMEOUT_SECS",
                value: raw,
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            dodgeball_api_url,
            dodgeball_private_api_key,
            checkpoint_timeout,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn dodgeball(&self) -> DodgeballConfig {
        DodgeballConfig {
            api_url: self.dodgeball_api_url.clone(),
            secret_key: self.dodgeball_private_api_key.clone(),
            http_timeout: self.http_timeout,
        }
    }
}

/// Load the dotenv file named by ENV_FILE (default `.env`).
///
/// A missing file is not an error since deployments may inject the
/// environment directly; a file that exists but cannot be parsed is.
pub fn load_env_file() -> Result<(), ConfigError> {
    let path = env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    load_env_file_from(Path::new(&path))
}

fn load_env_file_from(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "Env file not found, using process environment");
        return Ok(());
    }

    dotenv::from_path(path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(path = %path.display(), "Loaded env file");
    Ok(())
}
