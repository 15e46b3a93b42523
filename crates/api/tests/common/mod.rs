#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use banner_api::config::{ServerConfig, WorkerConfig};
use banner_api::router::build_app_router;
use banner_api::state::AppState;

/// A throwaway worker: a `sh` script in its own temporary directory.
///
/// The directory is removed when this is dropped, so keep it alive for the
/// duration of the test.
pub struct TestWorker {
    pub dir: TempDir,
    pub config: WorkerConfig,
}

impl TestWorker {
    /// Write `body` as `worker.sh` and run it with `sh`.
    ///
    /// The script receives the standard scrape arguments, so `$2` is the URL,
    /// `$4` the region and `$6` the headless flag.
    pub fn script(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("worker.sh");
        std::fs::write(&script, body).expect("write worker script");
        let config = WorkerConfig {
            program: "sh".into(),
            script: Some(script),
            working_dir: dir.path().to_path_buf(),
            timeout: Some(Duration::from_secs(10)),
        };
        Self { dir, config }
    }

    /// A worker whose executable does not exist.
    pub fn missing() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = WorkerConfig {
            program: "/nonexistent/banner-scraper".into(),
            script: None,
            working_dir: PathBuf::from(dir.path()),
            timeout: None,
        };
        Self { dir, config }
    }
}

/// A worker that reports two steps and prints a result.
pub const SUCCESS_SCRIPT: &str = r#"
echo "[*] Opening $2"
echo "debug: browser launched"
echo "[+] Found 2 banners"
echo '{not json'
printf '{"homepage":[{"src":"a.png"},{"src":"b.png"}],"promotions":[]}\n'
"#;

/// Build a test `ServerConfig` with safe defaults around `worker`.
pub fn test_config(worker: WorkerConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        session_ttl: None,
        worker,
    }
}

/// Build the full application router, returning the state alongside it so
/// tests can inspect the store or shut the orchestrator down.
pub fn build_test_app(worker: &TestWorker) -> (Router, AppState) {
    let config = test_config(worker.config.clone());
    let state = AppState::new(config.clone());
    (build_app_router(state.clone(), &config), state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Submit a scrape and return the new session id.
pub async fn submit(app: &Router, body: Value) -> String {
    let response = post_json(app.clone(), "/api/scrape", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    body_json(response).await["sessionId"]
        .as_str()
        .expect("sessionId is a string")
        .to_string()
}

/// Poll a session until it leaves `running`, returning its final snapshot.
pub async fn wait_for_terminal(app: &Router, session_id: &str) -> Value {
    let uri = format!("/api/scrape/{session_id}");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        let json = body_json(get(app.clone(), &uri).await).await;
        if json["status"] != "running" {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session {session_id} still running: {json}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
