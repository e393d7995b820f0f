//! Core domain logic for GrimoirePlot.
//! This crate is the single source of truth for storage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod retry;
pub mod service;

pub use config::{ConfigError, ConfigResult, GrimoireConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogDestination, LoggingError};
pub use model::plot::{
    validate_name, AddPlotRequest, AddPlotResponse, Chapter, ChapterKey, DeleteResponse, Grimoire,
    NameValidationError, Plot, PlotKey,
};
pub use repo::plot_repo::{PlotRepoError, PlotRepoResult, PlotRepository, SqlitePlotRepository};
pub use retry::RetryPolicy;
pub use service::plot_service::{
    with_plot_service, with_plot_service_timeout, PlotService, PlotServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
