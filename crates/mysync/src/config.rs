//! Engine configuration.
//!
//! A [`Config`] is passed explicitly to [`SchemaSync`](crate::SchemaSync).
//! Applications that want a process-wide instance can register one with
//! [`init`]; registering twice is an error, not a panic.

use crate::{Error, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::OnceLock;

/// Charset used when none is configured.
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Environment variable holding the charset.
pub const CHARSET_VAR: &str = "MYSYNC_CHARSET";

/// Environment variable holding the connection url.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Substituted verbatim into every `CREATE TABLE` statement.
    pub charset: String,
    /// Only needed by [`connect`].
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_CHARSET)
    }
}

impl Config {
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
            database_url: None,
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Read configuration from the environment, loading `.env` first if one
    /// exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let charset = lookup(CHARSET_VAR)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());

        let config = Self {
            charset,
            database_url: lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// The charset ends up unquoted in DDL, so only identifier characters
    /// are accepted.
    pub fn validate(&self) -> Result<()> {
        if self.charset.is_empty() {
            return Err(Error::InvalidConfig("charset must not be empty".to_string()));
        }
        if !self
            .charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::InvalidConfig(format!(
                "invalid charset `{}`",
                self.charset
            )));
        }
        Ok(())
    }
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Register the process-wide configuration.
pub fn init(config: Config) -> Result<&'static Config> {
    config.validate()?;
    let mut fresh = Some(config);
    let stored = GLOBAL.get_or_init(|| fresh.take().unwrap_or_default());
    match fresh {
        None => Ok(stored),
        Some(_) => Err(Error::AlreadyInitialized),
    }
}

/// The process-wide configuration, if [`init`] has been called.
pub fn global() -> Option<&'static Config> {
    GLOBAL.get()
}

/// Open a pool on the configured database.
pub async fn connect(config: &Config) -> Result<MySqlPool> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", DATABASE_URL_VAR)))?;
    let pool = MySqlPoolOptions::new().connect(url).await?;
    Ok(pool)
}
