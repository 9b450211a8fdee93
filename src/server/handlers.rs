use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::pipeline::DownloadResponse;
use crate::server::errors::ApiError;
use crate::server::AppState;
use crate::BridgeError;

pub(crate) const MISSING_URL: &str = "Missing 'url' parameter";

/// Inbound body or query for `/download`; the first non-empty field wins
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadRequest {
    url: Option<String>,
    video_id: Option<String>,
    youtube_url: Option<String>,
}

impl DownloadRequest {
    fn reference(&self) -> Option<&str> {
        [&self.url, &self.video_id, &self.youtube_url]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn download_post(State(state): State<AppState>, body: Bytes) -> Result<Json<DownloadResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        DownloadRequest::default()
    } else {
        serde_json::from_slice::<DownloadRequest>(&body)
            .map_err(|e| BridgeError::InvalidRequest(format!("Invalid JSON body: {}", e)))?
    };

    download(&state, &request).await
}

pub(crate) async fn download_get(
    State(state): State<AppState>,
    query: Result<Query<DownloadRequest>, QueryRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Query(request) = query
        .map_err(|rejection| BridgeError::InvalidRequest(format!("Invalid query string: {}", rejection.body_text())))?;

    download(&state, &request).await
}

async fn download(state: &AppState, request: &DownloadRequest) -> Result<Json<DownloadResponse>, ApiError> {
    let reference = request.reference().ok_or_else(|| BridgeError::InvalidRequest(MISSING_URL.to_string()))?;

    let audio = state.pipeline.fetch(reference).await?;
    Ok(Json(DownloadResponse::from(audio)))
}
