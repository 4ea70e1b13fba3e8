//! services/app/src/web/entry.rs
//!
//! The entry screen and the preference endpoints. These stay reachable before
//! the user has entered, since the consent banner and the theme switch are
//! shown on the entry screen too.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use juriscan_core::{ConsentChoice, PreferencesView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::rest::{reject, ApiResult};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct PreferencesResponse(pub PreferencesView);

#[derive(Deserialize, ToSchema)]
pub struct ConsentRequest {
    /// `accepted` or `rejected`.
    #[schema(value_type = String)]
    pub choice: ConsentChoice,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /enter - Pass the entry screen
#[utoipa::path(
    post,
    path = "/enter",
    responses((status = 204, description = "Entered"))
)]
pub async fn enter_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.app.enter().await;
    StatusCode::NO_CONTENT
}

/// POST /leave - Return to the entry screen, discarding the current session
#[utoipa::path(
    post,
    path = "/leave",
    responses((status = 204, description = "Left"))
)]
pub async fn leave_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.app.leave().await;
    StatusCode::NO_CONTENT
}

/// GET /preferences - Current theme and cookie consent
#[utoipa::path(
    get,
    path = "/preferences",
    responses((status = 200, description = "Current preferences", body = PreferencesResponse))
)]
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
) -> Json<PreferencesResponse> {
    Json(PreferencesResponse(state.app.preferences().await))
}

/// POST /preferences/theme/toggle - Switch between light and dark
#[utoipa::path(
    post,
    path = "/preferences/theme/toggle",
    responses(
        (status = 200, description = "Theme switched and saved", body = PreferencesResponse),
        (status = 500, description = "The preference could not be saved")
    )
)]
pub async fn toggle_theme_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PreferencesResponse>> {
    let view = state.app.toggle_theme().await.map_err(|e| {
        error!("Failed to save theme: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save theme")
    })?;
    Ok(Json(PreferencesResponse(view)))
}

/// POST /preferences/consent - Answer the cookie banner
#[utoipa::path(
    post,
    path = "/preferences/consent",
    request_body = ConsentRequest,
    responses(
        (status = 200, description = "Choice recorded", body = PreferencesResponse),
        (status = 409, description = "A choice was already recorded"),
        (status = 500, description = "The choice could not be saved")
    )
)]
pub async fn consent_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConsentRequest>,
) -> ApiResult<Json<PreferencesResponse>> {
    let recorded = state.app.record_consent(req.choice).await.map_err(|e| {
        error!("Failed to save cookie consent: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save cookie consent")
    })?;
    match recorded {
        Some(view) => Ok(Json(PreferencesResponse(view))),
        None => Err(reject(StatusCode::CONFLICT, "Cookie consent was already recorded")),
    }
}
