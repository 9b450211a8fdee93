use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use audio_bridge::config::Config;
use audio_bridge::server::{router, AppState};
use audio_bridge::{BridgeError, ExtractionConfig, ExtractionResult, MediaExtractor};

#[derive(Clone, Copy)]
enum Behavior {
    Succeed { bytes: usize },
    Fail(&'static str),
    Hang,
}

/// Stands in for yt-dlp: writes real files under the requested template
struct FakeExtractor {
    behavior: Behavior,
    calls: AtomicUsize,
    references: Mutex<Vec<String>>,
    templates: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            references: Mutex::new(Vec::new()),
            templates: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn expand(config: &ExtractionConfig, ext: &str) -> PathBuf {
    PathBuf::from(config.output_template.to_string_lossy().replace("%(ext)s", ext))
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract(&self, reference: &str, config: &ExtractionConfig) -> Result<ExtractionResult, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.references.lock().unwrap().push(reference.to_string());
        self.templates.lock().unwrap().push(config.output_template.clone());

        match self.behavior {
            Behavior::Succeed { bytes } => {
                let path = expand(config, "mp3");
                std::fs::write(&path, vec![0xABu8; bytes]).unwrap();
                // Let concurrent requests overlap
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(ExtractionResult {
                    title: "Test Video".to_string(),
                    duration_seconds: Some(42.0),
                    produced_path: path,
                })
            }
            Behavior::Fail(message) => {
                std::fs::write(expand(config, "webm.part"), b"partial").unwrap();
                Err(BridgeError::ExtractionFailed(message.to_string()))
            }
            Behavior::Hang => {
                std::fs::write(expand(config, "webm.part"), b"partial").unwrap();
                tokio::time::sleep(Duration::from_secs(30)).await;
                unreachable!("extraction should have timed out")
            }
        }
    }

    fn tool_name(&self) -> &'static str {
        "fake"
    }
}

struct Harness {
    app: Router,
    extractor: Arc<FakeExtractor>,
    temp: TempDir,
}

impl Harness {
    fn new(behavior: Behavior, api_key: Option<&str>) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.auth.api_key = api_key.map(str::to_string);
        config.extraction.temp_dir = Some(temp.path().to_path_buf());
        config.extraction.timeout_secs = 1;

        let extractor = FakeExtractor::new(behavior);
        let app = router(AppState::new(&config, extractor.clone()));
        Self { app, extractor, temp }
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.temp.path()).unwrap().count()
    }
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_post_download_success() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 500 }, None);

    let (status, body) = harness
        .send(post_json(json!({"url": "https://youtube.com/watch?v=abc123"})))
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Test Video");
    assert_eq!(body["videoId"], "abc123");
    assert_eq!(body["duration"], json!(42));
    assert_eq!(body["contentType"], "audio/mpeg");
    assert_eq!(body["fileSize"], 500);

    let decoded = STANDARD.decode(body["fileBase64"].as_str().unwrap())?;
    assert_eq!(decoded.len() as u64, body["fileSize"].as_u64().unwrap());
    assert!(decoded.iter().all(|b| *b == 0xAB));

    assert_eq!(harness.extractor.calls(), 1);
    assert_eq!(
        harness.extractor.references.lock().unwrap()[0],
        "https://www.youtube.com/watch?v=abc123"
    );
    assert_eq!(harness.leftover_files(), 0);
    Ok(())
}

#[tokio::test]
async fn test_post_accepts_video_id_field() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let (status, body) = harness.send(post_json(json!({"videoId": "dQw4w9WgXcQ"}))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["videoId"], "dQw4w9WgXcQ");
    Ok(())
}

#[tokio::test]
async fn test_missing_url_is_bad_request() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let (status, body) = harness.send(post_json(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing 'url' parameter"}));

    let (status, body) = harness.send(get("/download", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing 'url' parameter"}));

    assert_eq!(harness.extractor.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let (status, body) = harness.send(get("/download?url=abc123&url=def456", None)).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));
    assert_eq!(harness.extractor.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = harness.send(request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    assert_eq!(harness.extractor.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_reference_is_bad_request() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let (status, body) = harness.send(post_json(json!({"url": "https://vimeo.com/12345"}))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid video reference"));
    assert_eq!(harness.extractor.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_wrong_or_missing_api_key_is_rejected_before_extraction() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, Some("secret"));
    let uri = "/download?url=https%3A%2F%2Fyoutu.be%2Fabc123";

    let (status, body) = harness.send(get(uri, Some("wrong"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid API key"}));

    let (status, body) = harness.send(get(uri, None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Missing X-API-Key header"}));

    let mut request = post_json(json!({"url": "abc123"}));
    request.headers_mut().insert("X-API-Key", "nope".parse()?);
    let (status, _) = harness.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(harness.extractor.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_matching_api_key_is_accepted() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, Some("secret"));

    let (status, body) = harness
        .send(get("/download?url=https%3A%2F%2Fyoutu.be%2Fabc123", Some("secret")))
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["videoId"], "abc123");
    Ok(())
}

#[tokio::test]
async fn test_no_api_key_configured_ignores_header() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 10 }, None);

    let (status, _) = harness.send(get("/download?url=abc123", Some("whatever"))).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = harness.send(get("/download?url=abc123", None)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_extraction_failure_surfaces_message_and_cleans_up() -> Result<()> {
    let harness = Harness::new(
        Behavior::Fail("ERROR: [youtube] abc123: Video unavailable"),
        None,
    );

    let (status, body) = harness.send(post_json(json!({"url": "abc123"}))).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "ERROR: [youtube] abc123: Video unavailable"}));
    assert_eq!(harness.extractor.calls(), 1);
    assert_eq!(harness.leftover_files(), 0);
    Ok(())
}

#[tokio::test]
async fn test_hung_extraction_times_out_and_cleans_up() -> Result<()> {
    let harness = Harness::new(Behavior::Hang, None);

    let (status, body) = harness.send(post_json(json!({"url": "abc123"}))).await?;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    assert_eq!(harness.leftover_files(), 0);
    Ok(())
}

#[tokio::test]
async fn test_health_is_open_regardless_of_auth() -> Result<()> {
    for key in [None, Some("secret")] {
        let harness = Harness::new(Behavior::Succeed { bytes: 10 }, key);
        let (status, body) = harness.send(get("/health", None)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_for_same_video_do_not_collide() -> Result<()> {
    let harness = Harness::new(Behavior::Succeed { bytes: 64 }, None);

    let (first, second) = tokio::join!(
        harness.send(post_json(json!({"url": "abc123"}))),
        harness.send(post_json(json!({"url": "https://youtu.be/abc123"}))),
    );
    let (first, second) = (first?, second?);

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.1["fileSize"], 64);
    assert_eq!(second.1["fileSize"], 64);

    let templates = harness.extractor.templates.lock().unwrap().clone();
    assert_eq!(templates.len(), 2);
    assert_ne!(templates[0], templates[1]);
    assert_eq!(harness.leftover_files(), 0);
    Ok(())
}
