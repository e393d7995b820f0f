use grimoire_core::db::open_db;
use grimoire_core::{with_plot_service, Grimoire, GrimoireConfig, RetryPolicy};
use grimoire_server::{build_router, AppState, RefreshEvent};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

const SECRET: &str = "test-secret";

struct TestServer {
    base: String,
    db_path: PathBuf,
    state: AppState,
    client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        };
        Self::start_with(retry, Duration::from_secs(5)).await
    }

    async fn start_with(retry: RetryPolicy, busy_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("grimoire.db");
        let db_value = db_path.to_str().expect("utf-8 path").to_string();
        let config = GrimoireConfig::from_lookup(|key| match key {
            "GRIMOIRE_SECRET" => Some(SECRET.to_string()),
            "GRIMOIRE_SERVER" => Some("http://127.0.0.1:0".to_string()),
            "GRIMOIRE_DB" => Some(db_value.clone()),
            _ => None,
        })
        .expect("config");
        let state = AppState::new(config)
            .with_retry(retry)
            .with_busy_timeout(busy_timeout);
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        Self {
            base: format!("http://{addr}"),
            db_path,
            state,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn push(
        &self,
        grimoire: &str,
        chapter: &str,
        plot: &str,
        figure: &Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/add_plot"))
            .header("grimoire-secret", SECRET)
            .json(&json!({
                "grimoire_name": grimoire,
                "chapter_name": chapter,
                "plot_name": plot,
                "json_data": figure.to_string(),
            }))
            .send()
            .await
            .expect("push request")
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("grimoire-secret", SECRET)
            .send()
            .await
            .expect("delete request")
    }

    async fn ui_post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-grimoire-ui-token", self.state.ui_token.as_ref())
            .send()
            .await
            .expect("ui request")
    }

    fn stored(&self) -> Vec<Grimoire> {
        with_plot_service(&self.db_path, |service| service.list_grimoires())
            .expect("list grimoires")
    }
}

fn sample_figure() -> Value {
    json!({
        "data": [{"type": "scatter", "x": [1, 2, 3], "y": [4, 5, 6], "mode": "lines+markers"}],
        "layout": {"title": {"text": "Line Plot"}}
    })
}

async fn next_event(events: &mut broadcast::Receiver<RefreshEvent>) -> RefreshEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("refresh event in time")
        .expect("open channel")
}

#[tokio::test]
async fn add_plot_persists_full_hierarchy() {
    let server = TestServer::start().await;
    let figure = sample_figure();

    let response = server.push("g1", "ch1", "p1", &figure).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"status": "success", "plot_name": "p1"}));

    let grimoires = server.stored();
    assert_eq!(grimoires.len(), 1);
    assert_eq!(grimoires[0].name, "g1");
    assert_eq!(grimoires[0].chapters.len(), 1);
    assert_eq!(grimoires[0].chapters[0].name, "ch1");
    let plots = &grimoires[0].chapters[0].plots;
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].name, "p1");
    let stored: Value = serde_json::from_str(&plots[0].json_data).expect("stored json");
    assert_eq!(stored, figure);
}

#[tokio::test]
async fn repeated_push_overwrites_single_plot() {
    let server = TestServer::start().await;
    server.push("g1", "ch1", "p1", &sample_figure()).await;
    let updated = json!({"data": [], "layout": {"title": {"text": "v2"}}});
    let response = server.push("g1", "ch1", "p1", &updated).await;
    assert_eq!(response.status(), 200);

    let grimoires = server.stored();
    assert_eq!(grimoires[0].plot_count(), 1);
    let stored: Value =
        serde_json::from_str(&grimoires[0].chapters[0].plots[0].json_data).expect("json");
    assert_eq!(stored["layout"]["title"]["text"], "v2");
}

#[tokio::test]
async fn missing_or_wrong_secret_is_rejected_without_writes() {
    let server = TestServer::start().await;
    let body = json!({
        "grimoire_name": "g1",
        "chapter_name": "ch1",
        "plot_name": "p1",
        "json_data": "{}",
    });

    let missing = server
        .client
        .post(server.url("/add_plot"))
        .json(&body)
        .send()
        .await
        .expect("request");
    assert_eq!(missing.status(), 401);
    let detail: Value = missing.json().await.expect("json");
    assert_eq!(detail["detail"], "grimoire-secret not found");

    let wrong = server
        .client
        .post(server.url("/add_plot"))
        .header("grimoire-secret", "not-the-secret")
        .json(&body)
        .send()
        .await
        .expect("request");
    assert_eq!(wrong.status(), 403);
    let detail: Value = wrong.json().await.expect("json");
    assert_eq!(detail["detail"], "invalid grimoire-secret");

    let unauthenticated_delete = server
        .client
        .delete(server.url("/grimoire/g1"))
        .send()
        .await
        .expect("request");
    assert_eq!(unauthenticated_delete.status(), 401);

    assert!(server.stored().is_empty());
}

#[tokio::test]
async fn malformed_bodies_and_empty_names_are_unprocessable() {
    let server = TestServer::start().await;

    let missing_field = server
        .client
        .post(server.url("/add_plot"))
        .header("grimoire-secret", SECRET)
        .json(&json!({"grimoire_name": "g1", "chapter_name": "ch1"}))
        .send()
        .await
        .expect("request");
    assert_eq!(missing_field.status(), 422);

    let empty_name = server.push("g1", "", "p1", &sample_figure()).await;
    assert_eq!(empty_name.status(), 422);
    let detail: Value = empty_name.json().await.expect("json");
    assert_eq!(detail["detail"], "chapter_name must not be empty");

    assert!(server.stored().is_empty());
}

#[tokio::test]
async fn deletes_cascade_and_report_missing_targets() {
    let server = TestServer::start().await;
    server.push("g1", "ch1", "p1", &sample_figure()).await;
    server.push("g1", "ch1", "p2", &sample_figure()).await;
    server.push("g1", "ch2", "p1", &sample_figure()).await;
    server.push("g2", "ch1", "p1", &sample_figure()).await;

    let missing = server.delete("/grimoire/g1/chapter/ch1/plot/nope").await;
    assert_eq!(missing.status(), 404);
    let detail: Value = missing.json().await.expect("json");
    assert_eq!(detail["detail"], "Plot not found");
    assert_eq!(server.delete("/grimoire/g1/chapter/nope").await.status(), 404);
    assert_eq!(server.delete("/grimoire/nope").await.status(), 404);

    let plot = server.delete("/grimoire/g1/chapter/ch1/plot/p1").await;
    assert_eq!(plot.status(), 200);
    let body: Value = plot.json().await.expect("json");
    assert_eq!(body, json!({"status": "success", "deleted": "p1"}));
    assert_eq!(server.stored()[0].plot_count(), 2);

    let chapter = server.delete("/grimoire/g1/chapter/ch1").await;
    assert_eq!(chapter.status(), 200);
    let body: Value = chapter.json().await.expect("json");
    assert_eq!(body["deleted"], "ch1");
    let grimoires = server.stored();
    assert_eq!(grimoires[0].chapters.len(), 1);
    assert_eq!(grimoires[0].chapters[0].name, "ch2");

    let grimoire = server.delete("/grimoire/g1").await;
    assert_eq!(grimoire.status(), 200);
    let grimoires = server.stored();
    assert_eq!(grimoires.len(), 1);
    assert_eq!(grimoires[0].name, "g2");
    assert_eq!(grimoires[0].plot_count(), 1);
}

#[tokio::test]
async fn dashboard_page_and_fragments_render_stored_plots() {
    let server = TestServer::start().await;

    let empty = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request");
    assert_eq!(empty.status(), 200);
    assert!(empty.text().await.expect("html").contains("No grimoires yet"));

    server.push("exp <1>", "train", "loss", &sample_figure()).await;
    server
        .client
        .post(server.url("/add_plot"))
        .header("grimoire-secret", SECRET)
        .json(&json!({
            "grimoire_name": "exp <1>",
            "chapter_name": "train",
            "plot_name": "broken",
            "json_data": "{{not json",
        }))
        .send()
        .await
        .expect("request");

    let page = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request");
    assert_eq!(page.status(), 200);
    let html = page.text().await.expect("html");
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("exp &lt;1&gt;"));
    assert!(html.contains("Line Plot"));

    let chapter = server
        .client
        .get(server.url("/fragments/grimoire/exp%20%3C1%3E/chapter/train"))
        .send()
        .await
        .expect("request");
    assert_eq!(chapter.status(), 200);
    let fragment = chapter.text().await.expect("html");
    assert!(fragment.starts_with(r#"<div class="chapter-panel" data-region="chapter""#));
    assert!(fragment.contains("loss"));
    assert!(fragment.contains("Invalid data"));

    let unknown = server
        .client
        .get(server.url("/fragments/grimoire/nope"))
        .send()
        .await
        .expect("request");
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn pushes_refresh_chapter_region_once_rendered() {
    let server = TestServer::start().await;
    let mut events = server.state.refresh.subscribe();

    server.push("g1", "ch1", "p1", &sample_figure()).await;
    assert_eq!(next_event(&mut events).await, RefreshEvent::Dashboard);

    let page = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request");
    assert_eq!(page.status(), 200);

    server.push("g1", "ch1", "p2", &sample_figure()).await;
    assert_eq!(
        next_event(&mut events).await,
        RefreshEvent::Chapter {
            grimoire: "g1".to_string(),
            chapter: "ch1".to_string(),
        }
    );

    server.push("g1", "ch9", "p1", &sample_figure()).await;
    assert_eq!(next_event(&mut events).await, RefreshEvent::Dashboard);
}

#[tokio::test]
async fn ui_deletes_with_page_token_refresh_enclosing_region() {
    let server = TestServer::start().await;
    server.push("g1", "ch1", "p1", &sample_figure()).await;
    server.push("g1", "ch2", "p1", &sample_figure()).await;
    server.client.get(server.url("/")).send().await.expect("request");
    let mut events = server.state.refresh.subscribe();

    let chapter = server.ui_post("/ui/grimoire/g1/chapter/ch1/delete").await;
    assert_eq!(chapter.status(), 200);
    assert_eq!(
        next_event(&mut events).await,
        RefreshEvent::Grimoire {
            grimoire: "g1".to_string()
        }
    );
    assert_eq!(server.stored()[0].chapters.len(), 1);

    let missing = server.ui_post("/ui/grimoire/g1/chapter/ch1/delete").await;
    assert_eq!(missing.status(), 404);

    let grimoire = server.ui_post("/ui/grimoire/g1/delete").await;
    assert_eq!(grimoire.status(), 200);
    assert_eq!(next_event(&mut events).await, RefreshEvent::Dashboard);
    assert!(server.stored().is_empty());
}

#[tokio::test]
async fn ui_deletes_reject_foreign_origin_and_missing_token() {
    let server = TestServer::start().await;
    server.push("g", "c", "p", &sample_figure()).await;

    let page = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("html");
    assert!(page.contains(&format!(
        r#"<meta name="grimoire-ui-token" content="{}">"#,
        server.state.ui_token
    )));

    let cross_site_form = server
        .client
        .post(server.url("/ui/grimoire/g/delete"))
        .header("origin", "http://evil.example")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("confirm=1")
        .send()
        .await
        .expect("request");
    assert_eq!(cross_site_form.status(), 403);
    let detail: Value = cross_site_form.json().await.expect("json");
    assert_eq!(detail["detail"], "dashboard request rejected");

    let tokenless = server
        .client
        .post(server.url("/ui/grimoire/g/chapter/c/delete"))
        .send()
        .await
        .expect("request");
    assert_eq!(tokenless.status(), 403);

    let foreign_with_token = server
        .client
        .post(server.url("/ui/grimoire/g/delete"))
        .header("origin", "http://evil.example")
        .header("x-grimoire-ui-token", server.state.ui_token.as_ref())
        .send()
        .await
        .expect("request");
    assert_eq!(foreign_with_token.status(), 403);

    let grimoires = server.stored();
    assert_eq!(grimoires.len(), 1);
    assert_eq!(grimoires[0].plot_count(), 1);

    let same_origin = server
        .client
        .post(server.url("/ui/grimoire/g/delete"))
        .header("origin", server.base.as_str())
        .header("x-grimoire-ui-token", server.state.ui_token.as_ref())
        .send()
        .await
        .expect("request");
    assert_eq!(same_origin.status(), 200);
    assert!(server.stored().is_empty());
}

#[tokio::test]
async fn chapter_fragment_reports_missing_chapter() {
    let server = TestServer::start().await;
    server.push("g", "c", "p", &sample_figure()).await;

    let missing = server
        .client
        .get(server.url("/fragments/grimoire/g/chapter/nope"))
        .send()
        .await
        .expect("request");
    assert_eq!(missing.status(), 404);
    let detail: Value = missing.json().await.expect("json");
    assert_eq!(detail["detail"], "Chapter not found");

    let present = server
        .client
        .get(server.url("/fragments/grimoire/g/chapter/c"))
        .send()
        .await
        .expect("request");
    assert_eq!(present.status(), 200);
    assert!(present.text().await.expect("html").contains(r#"data-chapter="c""#));
}

#[tokio::test]
async fn locked_database_exhausts_retries_into_server_error() {
    let retry = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
    };
    let server = TestServer::start_with(retry, Duration::from_millis(20)).await;
    let lock = open_db(&server.db_path).expect("open db");
    lock.execute_batch("BEGIN EXCLUSIVE;").expect("exclusive lock");

    let response = server.push("g", "c", "p", &sample_figure()).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body, json!({"detail": "Internal server error"}));

    lock.execute_batch("COMMIT;").expect("release lock");
    assert!(server.stored().is_empty());
}

#[tokio::test]
async fn push_succeeds_once_lock_is_released_between_attempts() {
    let retry = RetryPolicy {
        max_attempts: 8,
        base_delay: Duration::from_millis(20),
    };
    let server = TestServer::start_with(retry, Duration::from_millis(20)).await;
    let lock = open_db(&server.db_path).expect("open db");
    lock.execute_batch("BEGIN EXCLUSIVE;").expect("exclusive lock");

    let client = server.client.clone();
    let url = server.url("/add_plot");
    let push = tokio::spawn(async move {
        client
            .post(url)
            .header("grimoire-secret", SECRET)
            .json(&json!({
                "grimoire_name": "g",
                "chapter_name": "c",
                "plot_name": "p",
                "json_data": sample_figure().to_string(),
            }))
            .send()
            .await
            .expect("push request")
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    lock.execute_batch("COMMIT;").expect("release lock");

    let response = push.await.expect("push task");
    assert_eq!(response.status(), 200);
    let grimoires = server.stored();
    assert_eq!(grimoires.len(), 1);
    assert_eq!(grimoires[0].plot_count(), 1);
}
