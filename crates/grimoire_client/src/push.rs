use crate::error::{ClientError, ClientResult};
use grimoire_core::logging::sanitize_message;
use grimoire_core::{AddPlotRequest, AddPlotResponse, GrimoireConfig};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

pub const SECRET_HEADER: &str = "grimoire-secret";
const MAX_DETAIL_CHARS: usize = 200;

/// Server address and shared secret to push to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub server: String,
    pub secret: String,
}

impl PushTarget {
    pub fn new(server: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            secret: secret.into(),
        }
    }

    pub fn from_config(config: &GrimoireConfig) -> Self {
        Self::new(config.server_url.clone(), config.secret.clone())
    }

    fn add_plot_url(&self) -> String {
        format!("{}/add_plot", self.server.trim_end_matches('/'))
    }
}

/// Serializes `figure` and pushes it, blocking the calling thread.
///
/// Must not be called from inside an async runtime.
pub fn push_plot_blocking<F: Serialize + ?Sized>(
    target: &PushTarget,
    grimoire: &str,
    chapter: &str,
    plot: &str,
    figure: &F,
) -> ClientResult<AddPlotResponse> {
    let json_data = figure_json(figure)?;
    push_plot_json_blocking(target, grimoire, chapter, plot, json_data)
}

/// Pushes an already serialized figure, blocking the calling thread.
pub fn push_plot_json_blocking(
    target: &PushTarget,
    grimoire: &str,
    chapter: &str,
    plot: &str,
    json_data: impl Into<String>,
) -> ClientResult<AddPlotResponse> {
    let request = add_plot_request(grimoire, chapter, plot, json_data.into());
    let response = reqwest::blocking::Client::new()
        .post(target.add_plot_url())
        .header(SECRET_HEADER, &target.secret)
        .json(&request)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(status_error(status.as_u16(), &body));
    }
    let body = response.json::<AddPlotResponse>()?;
    debug!("event=plot_push module=client status=ok mode=blocking");
    Ok(body)
}

/// Serializes `figure` and pushes it.
pub async fn push_plot<F: Serialize + ?Sized>(
    target: &PushTarget,
    grimoire: &str,
    chapter: &str,
    plot: &str,
    figure: &F,
) -> ClientResult<AddPlotResponse> {
    let json_data = figure_json(figure)?;
    push_plot_json(target, grimoire, chapter, plot, json_data).await
}

/// Pushes an already serialized figure.
pub async fn push_plot_json(
    target: &PushTarget,
    grimoire: &str,
    chapter: &str,
    plot: &str,
    json_data: impl Into<String>,
) -> ClientResult<AddPlotResponse> {
    let request = add_plot_request(grimoire, chapter, plot, json_data.into());
    let response = reqwest::Client::new()
        .post(target.add_plot_url())
        .header(SECRET_HEADER, &target.secret)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status.as_u16(), &body));
    }
    let body = response.json::<AddPlotResponse>().await?;
    debug!("event=plot_push module=client status=ok mode=async");
    Ok(body)
}

fn add_plot_request(
    grimoire: &str,
    chapter: &str,
    plot: &str,
    json_data: String,
) -> AddPlotRequest {
    AddPlotRequest {
        grimoire_name: grimoire.to_string(),
        chapter_name: chapter.to_string(),
        plot_name: plot.to_string(),
        json_data,
    }
}

/// Serializes a figure, rejecting anything that is not a JSON object.
fn figure_json<F: Serialize + ?Sized>(figure: &F) -> ClientResult<String> {
    let value =
        serde_json::to_value(figure).map_err(|err| ClientError::InvalidFigure(err.to_string()))?;
    if !value.is_object() {
        return Err(ClientError::InvalidFigure(
            "figure must serialize to a JSON object".to_string(),
        ));
    }
    Ok(value.to_string())
}

fn status_error(status: u16, body: &str) -> ClientError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").map(detail_text))
        .unwrap_or_else(|| sanitize_message(body, MAX_DETAIL_CHARS));
    warn!("event=plot_push module=client status=error http_status={status}");
    ClientError::Status { status, detail }
}

fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
