//! Shared-secret check for the download routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::AuthConfig;
use crate::server::errors::ApiError;
use crate::server::AppState;
use crate::BridgeError;

/// Reject requests without the configured API key before any work is done.
/// When no key is configured every request passes.
pub(crate) async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let supplied = req
        .headers()
        .get(state.auth.header.as_str())
        .and_then(|value| value.to_str().ok());

    check_api_key(&state.auth, supplied)?;
    Ok(next.run(req).await)
}

pub(crate) fn check_api_key(auth: &AuthConfig, supplied: Option<&str>) -> crate::Result<()> {
    let Some(expected) = auth.required_key() else {
        return Ok(());
    };

    match supplied.map(str::trim) {
        Some(key) if key == expected => Ok(()),
        Some(_) => {
            tracing::warn!("rejected request with invalid API key");
            Err(BridgeError::Unauthorized("Invalid API key".to_string()))
        }
        None => Err(BridgeError::Unauthorized(format!("Missing {} header", auth.header))),
    }
}
