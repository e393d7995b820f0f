//! Plot use-case service.
//!
//! # Responsibility
//! - Validate names above the repository layer.
//! - Provide upsert, delete and listing entry points for HTTP and UI callers.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Payloads are passed through verbatim.

use crate::db::{open_db_with_busy_timeout, DbError, DEFAULT_BUSY_TIMEOUT};
use crate::model::plot::{Chapter, ChapterKey, Grimoire, NameValidationError, Plot, PlotKey};
use crate::repo::plot_repo::{PlotRepoError, PlotRepository, SqlitePlotRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Errors from plot service operations.
#[derive(Debug)]
pub enum PlotServiceError {
    /// A name component was empty.
    InvalidName(NameValidationError),
    /// Repository-level failure.
    Repo(PlotRepoError),
}

impl PlotServiceError {
    /// Returns whether the failed operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidName(_) => false,
            Self::Repo(err) => err.is_transient(),
        }
    }
}

impl Display for PlotServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlotServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<NameValidationError> for PlotServiceError {
    fn from(value: NameValidationError) -> Self {
        Self::InvalidName(value)
    }
}

impl From<PlotRepoError> for PlotServiceError {
    fn from(value: PlotRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for PlotServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(PlotRepoError::Db(value))
    }
}

/// Plot service facade.
pub struct PlotService<R: PlotRepository> {
    repo: R,
}

impl<R: PlotRepository> PlotService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores `json_data` under `key`, creating missing parents.
    ///
    /// # Contract
    /// - Rejects empty name components before touching storage.
    /// - Repeated calls with one key converge to the latest payload.
    pub fn upsert_plot(&self, key: &PlotKey, json_data: &str) -> Result<Plot, PlotServiceError> {
        key.validate()?;
        self.repo.upsert_plot(key, json_data).map_err(Into::into)
    }

    pub fn get_plot(&self, key: &PlotKey) -> Result<Option<Plot>, PlotServiceError> {
        self.repo.get_plot(key).map_err(Into::into)
    }

    /// Deletes one plot; `Ok(false)` means not found.
    pub fn delete_plot(&self, key: &PlotKey) -> Result<bool, PlotServiceError> {
        self.repo.delete_plot(key).map_err(Into::into)
    }

    /// Deletes one chapter with its plots; `Ok(false)` means not found.
    pub fn delete_chapter(&self, key: &ChapterKey) -> Result<bool, PlotServiceError> {
        self.repo.delete_chapter(key).map_err(Into::into)
    }

    /// Deletes one grimoire with everything beneath it; `Ok(false)` means not found.
    pub fn delete_grimoire(&self, name: &str) -> Result<bool, PlotServiceError> {
        self.repo.delete_grimoire(name).map_err(Into::into)
    }

    pub fn list_grimoires(&self) -> Result<Vec<Grimoire>, PlotServiceError> {
        self.repo.list_grimoires().map_err(Into::into)
    }

    pub fn get_grimoire(&self, name: &str) -> Result<Option<Grimoire>, PlotServiceError> {
        self.repo.get_grimoire(name).map_err(Into::into)
    }

    /// Loads one chapter together with its plots in display order.
    pub fn get_chapter(&self, key: &ChapterKey) -> Result<Option<Chapter>, PlotServiceError> {
        let Some(mut chapter) = self.repo.get_chapter(key)? else {
            return Ok(None);
        };
        chapter.plots = self.list_plots_in_chapter(key)?;
        Ok(Some(chapter))
    }

    pub fn list_plots_in_chapter(&self, key: &ChapterKey) -> Result<Vec<Plot>, PlotServiceError> {
        self.repo.list_plots_in_chapter(key).map_err(Into::into)
    }
}

/// Opens a short-lived connection to `db_path` and runs `f` against it.
///
/// The connection is dropped when `f` returns, so no lock outlives the call.
pub fn with_plot_service<T>(
    db_path: &Path,
    f: impl FnOnce(&PlotService<SqlitePlotRepository<'_>>) -> Result<T, PlotServiceError>,
) -> Result<T, PlotServiceError> {
    with_plot_service_timeout(db_path, DEFAULT_BUSY_TIMEOUT, f)
}

/// [`with_plot_service`] with an explicit SQLite busy timeout.
pub fn with_plot_service_timeout<T>(
    db_path: &Path,
    busy_timeout: Duration,
    f: impl FnOnce(&PlotService<SqlitePlotRepository<'_>>) -> Result<T, PlotServiceError>,
) -> Result<T, PlotServiceError> {
    let conn = open_db_with_busy_timeout(db_path, busy_timeout)?;
    let service = PlotService::new(SqlitePlotRepository::try_new(&conn)?);
    f(&service)
}
