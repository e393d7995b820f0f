//! Router assembly and process-level serving.

use crate::state::AppState;
use crate::{dashboard, http};
use axum::Router;
use grimoire_core::db::{open_db, DbError};
use grimoire_core::GrimoireConfig;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

#[derive(Debug)]
pub enum ServerError {
    /// Database could not be opened or migrated at startup.
    Storage(DbError),
    Bind { address: String, source: std::io::Error },
    Serve(std::io::Error),
    Startup(String),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "database startup failed: {err}"),
            Self::Bind { address, source } => write!(f, "cannot bind `{address}`: {source}"),
            Self::Serve(err) => write!(f, "server failed: {err}"),
            Self::Startup(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Bind { source, .. } => Some(source),
            Self::Serve(err) => Some(err),
            Self::Startup(_) => None,
        }
    }
}

/// Builds the full application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(http::routes())
        .merge(dashboard::routes())
        .with_state(state)
}

/// Migrates the database, binds `config.bind_address()` and serves until
/// `shutdown` resolves.
pub async fn serve(
    config: GrimoireConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let db_path = config.db_path.clone();
    tokio::task::spawn_blocking(move || open_db(&db_path).map(drop))
        .await
        .map_err(|err| ServerError::Startup(format!("database startup task failed: {err}")))?
        .map_err(ServerError::Storage)?;

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;

    info!(
        "event=server_start module=server status=ok address={} db={}",
        address,
        config.db_path.display()
    );
    let app = build_router(AppState::new(config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| {
            error!("event=server_stop module=server status=error error={err}");
            ServerError::Serve(err)
        })?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}
