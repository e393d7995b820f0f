//! HTTP surface of GrimoirePlot: ingestion, management and the live dashboard.
//!
//! Storage work always runs on the blocking pool through [`AppState`];
//! handlers never hold a SQLite connection across an `.await`.

pub mod dashboard;
pub mod http;
mod server;
mod state;

pub use dashboard::registry::{RefreshEvent, RefreshRegistry};
pub use http::error::ApiError;
pub use server::{build_router, serve, ServerError};
pub use state::AppState;
