//! Process logging bootstrap.
//!
//! # Responsibility
//! - Install the `log` backend once per process.
//! - Send records to stderr, or to size-rotated files under a directory.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and destination is a no-op.
//! - A second call asking for a different level or destination fails.
//! - Setup never panics; every failure is returned as `LoggingError`.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Once;

const FILE_BASENAME: &str = "grimoireplot";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    /// Rotating `grimoireplot*.log` files inside an absolute directory.
    Directory(PathBuf),
}

impl LogDestination {
    /// Resolves an optional directory setting; `None` means stderr.
    pub fn from_setting(log_dir: Option<&str>) -> Result<Self, LoggingError> {
        let Some(raw) = log_dir else {
            return Ok(Self::Stderr);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LoggingError::InvalidDirectory(
                "log directory cannot be empty".to_string(),
            ));
        }
        let path = Path::new(trimmed);
        if !path.is_absolute() {
            return Err(LoggingError::InvalidDirectory(format!(
                "log directory must be absolute, got `{trimmed}`"
            )));
        }
        Ok(Self::Directory(path.to_path_buf()))
    }
}

impl Display for LogDestination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Errors from logging setup.
#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    InvalidDirectory(String),
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(String),
    /// Logging is already running with different settings.
    Conflict {
        active: String,
        requested: String,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected one of {}",
                LEVELS.join("|")
            ),
            Self::InvalidDirectory(message) => write!(f, "{message}"),
            Self::CreateDirectory { path, source } => {
                write!(f, "cannot create log directory `{}`: {source}", path.display())
            }
            Self::Backend(message) => write!(f, "logger backend failed to start: {message}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already running as `{active}`; refusing to switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            _ => None,
        }
    }
}

struct ActiveLogger {
    level: &'static str,
    destination: LogDestination,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn describe(level: &str, destination: &LogDestination) -> String {
        format!("{level}@{destination}")
    }

    fn ensure_same(
        &self,
        level: &'static str,
        destination: &LogDestination,
    ) -> Result<(), LoggingError> {
        if self.level == level && &self.destination == destination {
            return Ok(());
        }
        Err(LoggingError::Conflict {
            active: Self::describe(self.level, &self.destination),
            requested: Self::describe(level, destination),
        })
    }
}

/// Starts process logging at `level`, writing to stderr or to `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `InvalidDirectory` for bad settings.
/// - `CreateDirectory` / `Backend` when the backend cannot start.
/// - `Conflict` when logging is already running with other settings.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let destination = LogDestination::from_setting(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| start_backend(level, &destination))?;
    active.ensure_same(level, &destination)
}

/// Level and destination of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, LogDestination)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.destination.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Normalizes a user-supplied level name. `warning` is accepted as `warn`.
pub(crate) fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let wanted = level.trim().to_ascii_lowercase();
    let wanted = if wanted == "warning" { "warn" } else { wanted.as_str() };
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == wanted)
        .ok_or_else(|| LoggingError::UnknownLevel(level.trim().to_string()))
}

fn start_backend(
    level: &'static str,
    destination: &LogDestination,
) -> Result<ActiveLogger, LoggingError> {
    let logger =
        Logger::try_with_str(level).map_err(|err| LoggingError::Backend(err.to_string()))?;

    let started = match destination {
        LogDestination::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format)
            .start(),
        LogDestination::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
    };
    let handle = started.map_err(|err| LoggingError::Backend(err.to_string()))?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_init module=logging status=ok level={} destination={} version={} os={}",
        level,
        destination,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        level,
        destination: destination.clone(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        // Payloads may quote request bodies; keep them short.
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            sanitize_message(&payload, PANIC_PAYLOAD_LIMIT)
        );
        previous(info);
    }));
}

/// Flattens newlines and truncates `value` to `max_chars` characters.
pub fn sanitize_message(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
