use crate::dashboard::registry::RefreshRegistry;
use crate::http::error::ApiError;
use grimoire_core::db::DEFAULT_BUSY_TIMEOUT;
use grimoire_core::{
    with_plot_service_timeout, GrimoireConfig, PlotService, PlotServiceError, RetryPolicy,
    SqlitePlotRepository,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GrimoireConfig>,
    pub retry: RetryPolicy,
    pub refresh: Arc<RefreshRegistry>,
    /// Per-process token the dashboard page echoes back on UI deletes.
    pub ui_token: Arc<str>,
    pub busy_timeout: Duration,
}

impl AppState {
    pub fn new(config: GrimoireConfig) -> Self {
        Self {
            config: Arc::new(config),
            retry: RetryPolicy::default(),
            refresh: Arc::new(RefreshRegistry::new()),
            ui_token: Arc::from(Uuid::new_v4().simple().to_string()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Runs one storage operation on the blocking pool, retrying transient failures.
    pub async fn storage_retrying<T, F>(
        &self,
        label: &'static str,
        operation: F,
    ) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: Fn(&PlotService<SqlitePlotRepository<'_>>) -> Result<T, PlotServiceError>
            + Send
            + 'static,
    {
        self.run_blocking(self.retry, label, operation).await
    }

    /// Runs one storage operation on the blocking pool, single attempt.
    pub async fn storage<T, F>(&self, label: &'static str, operation: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: Fn(&PlotService<SqlitePlotRepository<'_>>) -> Result<T, PlotServiceError>
            + Send
            + 'static,
    {
        let once = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        };
        self.run_blocking(once, label, operation).await
    }

    async fn run_blocking<T, F>(
        &self,
        policy: RetryPolicy,
        label: &'static str,
        operation: F,
    ) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: Fn(&PlotService<SqlitePlotRepository<'_>>) -> Result<T, PlotServiceError>
            + Send
            + 'static,
    {
        let db_path = self.config.db_path.clone();
        let busy_timeout = self.busy_timeout;
        let result = tokio::task::spawn_blocking(move || {
            policy.run(label, PlotServiceError::is_transient, || {
                with_plot_service_timeout(&db_path, busy_timeout, &operation)
            })
        })
        .await?;
        result.map_err(ApiError::from)
    }
}
