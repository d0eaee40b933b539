use std::sync::Arc;

use axum::{extract::{Request, State}, middleware::Next, response::Response};
use service::CookieService;
use tracing::warn;

use crate::errors::ApiError;

/// Header carrying the pre-shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub api_key: Arc<str>,
}

#[derive(Clone)]
pub struct ServerState {
    pub cookies: CookieService,
    pub auth: ServerAuthConfig,
}

impl ServerState {
    pub fn new(cookies: CookieService, api_key: &str) -> Self {
        Self { cookies, auth: ServerAuthConfig { api_key: Arc::from(api_key) } }
    }
}

/// Middleware: reject the request unless `x-api-key` equals the configured key.
pub async fn require_api_key(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let rejected = match presented {
        Some(key) if !key.is_empty() && key == &*state.auth.api_key => None,
        Some(_) => Some("invalid api key"),
        None => Some("missing api key header"),
    };
    if let Some(reason) = rejected {
        warn!(path = %req.uri().path(), reason, "unauthorized request");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
