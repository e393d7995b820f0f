//! Process configuration loaded once from the environment.
//!
//! # Responsibility
//! - Resolve secret, server address, database location and logging options.
//! - Apply documented insecure defaults and warn when they are used.
//!
//! # Invariants
//! - A `GrimoireConfig` is immutable after load and passed explicitly.
//! - The database target is always a file path (per-operation connections
//!   cannot share an in-memory database).

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_SECRET: &str = "GRIMOIRE_SECRET";
pub const ENV_SERVER: &str = "GRIMOIRE_SERVER";
pub const ENV_DB: &str = "GRIMOIRE_DB";
pub const ENV_TEST: &str = "GRIMOIRE_TEST";
pub const ENV_LOG_LEVEL: &str = "GRIMOIRE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GRIMOIRE_LOG_DIR";

pub const DEFAULT_SECRET: &str = "IDidntSetASecret";
pub const DEFAULT_SERVER: &str = "http://localhost:8080";
pub const DEFAULT_DB_FILE: &str = "database.db";
pub const TEST_DB_FILE: &str = "database-deleteme.db";
const DEFAULT_PORT: u16 = 8080;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while resolving configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `GRIMOIRE_SERVER` could not be split into host and port.
    InvalidServer(String),
    /// `GRIMOIRE_DB` uses a scheme other than `sqlite`.
    UnsupportedDatabase(String),
    /// `GRIMOIRE_DB` points at an in-memory database.
    InMemoryDatabase,
    /// `GRIMOIRE_LOG_LEVEL` is not a known level.
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidServer(value) => {
                write!(f, "invalid {ENV_SERVER} `{value}`; expected scheme://host:port")
            }
            Self::UnsupportedDatabase(value) => write!(
                f,
                "unsupported {ENV_DB} `{value}`; expected sqlite:///path or a file path"
            ),
            Self::InMemoryDatabase => write!(
                f,
                "{ENV_DB} must point at a file; in-memory databases are not supported"
            ),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Immutable process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrimoireConfig {
    /// Shared secret expected in the `grimoire-secret` header.
    pub secret: String,
    /// Base URL clients push to, e.g. `http://localhost:8080`.
    pub server_url: String,
    /// Bind host derived from `server_url`.
    pub host: String,
    /// Bind port derived from `server_url`.
    pub port: u16,
    /// SQLite database file.
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// `None` logs to stderr.
    pub log_dir: Option<String>,
    /// Environment variables that fell back to an insecure default.
    pub defaulted: Vec<&'static str>,
}

impl GrimoireConfig {
    /// Loads configuration from the process environment.
    ///
    /// Loading does not log; call [`GrimoireConfig::log_defaults`] once the
    /// logger is running.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut defaulted = Vec::new();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let secret = match read(ENV_SECRET) {
            Some(value) => value,
            None => {
                defaulted.push(ENV_SECRET);
                DEFAULT_SECRET.to_string()
            }
        };

        let server_url = match read(ENV_SERVER) {
            Some(value) => value.trim().trim_end_matches('/').to_string(),
            None => {
                defaulted.push(ENV_SERVER);
                DEFAULT_SERVER.to_string()
            }
        };
        let (host, port) = split_host_port(&server_url)?;

        let db_path = match read(ENV_DB) {
            Some(value) => parse_database_target(&value)?,
            None if read(ENV_TEST).as_deref().is_some_and(is_truthy) => PathBuf::from(TEST_DB_FILE),
            None => {
                defaulted.push(ENV_DB);
                PathBuf::from(DEFAULT_DB_FILE)
            }
        };

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(value) => crate::logging::parse_level(&value)
                .map_err(|err| ConfigError::InvalidLogLevel(err.to_string()))?,
            None => crate::logging::default_log_level(),
        };

        Ok(Self {
            secret,
            server_url,
            host,
            port,
            db_path,
            log_level,
            log_dir: read(ENV_LOG_DIR),
            defaulted,
        })
    }

    /// One warning line per variable in `defaulted`. The secret value is never included.
    pub fn default_warnings(&self) -> Vec<String> {
        self.defaulted
            .iter()
            .map(|key| {
                let detail = match *key {
                    ENV_SECRET => "value=<insecure default secret>".to_string(),
                    ENV_SERVER => format!("value={DEFAULT_SERVER}"),
                    ENV_DB => format!("value={DEFAULT_DB_FILE}"),
                    _ => "value=<default>".to_string(),
                };
                format!("event=config_default module=config status=warn key={key} {detail}")
            })
            .collect()
    }

    /// Logs [`GrimoireConfig::default_warnings`] at warn level.
    pub fn log_defaults(&self) {
        for line in self.default_warnings() {
            warn!("{line}");
        }
    }

    /// Returns `host:port` suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits `scheme://host:port[/...]` into host and port.
///
/// A missing port falls back to 8080.
pub fn split_host_port(server_url: &str) -> ConfigResult<(String, u16)> {
    let without_scheme = server_url
        .split_once("://")
        .map_or(server_url, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ConfigError::InvalidServer(server_url.to_string()));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidServer(server_url.to_string()))?;
            if host.is_empty() {
                return Err(ConfigError::InvalidServer(server_url.to_string()));
            }
            Ok((host.to_string(), port))
        }
        None => Ok((authority.to_string(), DEFAULT_PORT)),
    }
}

/// Resolves a database connection string to a SQLite file path.
///
/// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db` and bare paths.
pub fn parse_database_target(value: &str) -> ConfigResult<PathBuf> {
    let trimmed = value.trim();
    let path = match trimmed.split_once("://") {
        Some(("sqlite", rest)) => rest.strip_prefix('/').unwrap_or(rest),
        Some(_) => return Err(ConfigError::UnsupportedDatabase(trimmed.to_string())),
        None => trimmed,
    };

    if path.is_empty() || path == ":memory:" {
        return Err(ConfigError::InMemoryDatabase);
    }
    Ok(PathBuf::from(path))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
