//! services/app/src/web/middleware.rs
//!
//! Entry-gate middleware for the analysis, session and history routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Rejects requests with 401 until the user has passed the entry screen.
///
/// This is a local boolean gate, not authentication: there is one user and
/// nothing to verify.
pub async fn require_entry(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.app.is_entered().await {
        debug!(path = %req.uri().path(), "Request before entry rejected.");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}
