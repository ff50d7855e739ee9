use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use http::{header, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::{models::error::Error, utils::state::AppState};

/// Lets the request through only when it carries `Bearer {SECRET_KEY}`.
pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, Error> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or((StatusCode::UNAUTHORIZED, "Missing Bearer token"))?;

    if token.trim() != state.config.secret_key {
        warn!("Rejected trigger call to {} with a bad token", req.uri().path());
        return Err(Error::new(StatusCode::UNAUTHORIZED, "Invalid token"));
    }

    Ok(next.run(req).await)
}
