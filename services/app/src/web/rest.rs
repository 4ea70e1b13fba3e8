//! services/app/src/web/rest.rs
//!
//! Contains the Axum handlers for the analysis, session and history endpoints
//! and the master definition for the OpenAPI specification.

use crate::web::{entry, state::AppState, BODY_LIMIT};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use juriscan_core::{
    history::CLEAR_HISTORY_PROMPT, Confirmation, HistoryEntry, LoadEntryError, SessionSnapshot,
    SubmitError, UploadedFile, UserInput,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        entry::enter_handler,
        entry::leave_handler,
        entry::get_preferences_handler,
        entry::toggle_theme_handler,
        entry::consent_handler,
        analyze_text_handler,
        analyze_url_handler,
        analyze_file_handler,
        analyze_demo_handler,
        get_session_handler,
        reset_session_handler,
        list_history_handler,
        load_history_entry_handler,
        clear_history_handler,
    ),
    components(
        schemas(
            ErrorResponse, SessionResponse, HistoryResponse, ClearHistoryResponse,
            TextInput, UrlInput, entry::PreferencesResponse, entry::ConsentRequest
        )
    ),
    tags(
        (name = "JuriScan", description = "Local endpoints for contract and website compliance review.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// The session as the surface should render it.
#[derive(Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct SessionResponse(pub SessionSnapshot);

/// Past analyses, newest first.
#[derive(Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<Object>)]
pub struct HistoryResponse(pub Vec<HistoryEntry>);

#[derive(Serialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub cleared: bool,
    /// The question the surface must ask before sending `confirm=true`.
    pub prompt: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TextInput {
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UrlInput {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ClearHistoryParams {
    #[serde(default)]
    pub confirm: bool,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

pub fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { message: message.into() }))
}

fn submit_rejection(e: SubmitError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        SubmitError::Busy => reject(StatusCode::CONFLICT, e.to_string()),
        SubmitError::Local(local) => reject(StatusCode::UNPROCESSABLE_ENTITY, local.to_string()),
    }
}

/// A multipart read that failed. Bodies over the transport limit are the
/// user's oversized file, so they get the local "file too large" error.
async fn multipart_rejection(
    state: &AppState,
    declared_size: Option<u64>,
    e: MultipartError,
) -> (StatusCode, Json<ErrorResponse>) {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = declared_size.unwrap_or(BODY_LIMIT as u64);
        return submit_rejection(state.app.reject_oversized_upload(size).await);
    }
    reject(StatusCode::BAD_REQUEST, format!("Failed to read multipart data: {}", e))
}

/// Accepts the input, then runs the service call in the background so the
/// surface can poll `/session` for the status line.
async fn start_analysis(
    state: &AppState,
    input: UserInput,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let pending = state.app.submit(input).await.map_err(submit_rejection)?;
    tokio::spawn(pending.run());
    Ok((StatusCode::ACCEPTED, Json(SessionResponse(state.app.snapshot().await))))
}

//=========================================================================================
// Analysis Handlers
//=========================================================================================

/// Analyze pasted contract text.
#[utoipa::path(
    post,
    path = "/analyze/text",
    request_body = TextInput,
    responses(
        (status = 202, description = "Analysis started", body = SessionResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 409, description = "An analysis is already in progress", body = ErrorResponse),
        (status = 422, description = "Rejected locally", body = ErrorResponse)
    )
)]
pub async fn analyze_text_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TextInput>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    start_analysis(&state, UserInput::Text(input.text)).await
}

/// Audit a website.
#[utoipa::path(
    post,
    path = "/analyze/url",
    request_body = UrlInput,
    responses(
        (status = 202, description = "Audit started", body = SessionResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 409, description = "An analysis is already in progress", body = ErrorResponse),
        (status = 422, description = "Rejected locally", body = ErrorResponse)
    )
)]
pub async fn analyze_url_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UrlInput>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    start_analysis(&state, UserInput::Url(input.url)).await
}

/// Analyze an uploaded document or image.
///
/// Accepts a multipart/form-data request with a single file part
/// (PDF, Word `.docx`, plain text or an image, at most 5 MB).
#[utoipa::path(
    post,
    path = "/analyze/file",
    request_body(content_type = "multipart/form-data", description = "The document to analyze."),
    responses(
        (status = 202, description = "Analysis started", body = SessionResponse),
        (status = 400, description = "Bad request (e.g., missing file)", body = ErrorResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 409, description = "An analysis is already in progress", body = ErrorResponse),
        (status = 422, description = "Rejected locally (size, format, unreadable document)", body = ErrorResponse)
    )
)]
pub async fn analyze_file_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let declared_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err(reject(StatusCode::BAD_REQUEST, "Multipart form must include a file")),
        Err(e) => return Err(multipart_rejection(&state, declared_size, e).await),
    };

    let name = field.file_name().unwrap_or("document").to_string();
    let media_type = field.content_type().unwrap_or_default().to_string();
    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return Err(multipart_rejection(&state, declared_size, e).await),
    };

    info!(%name, %media_type, size = bytes.len(), "File received.");
    start_analysis(&state, UserInput::File(UploadedFile::new(name, media_type, bytes))).await
}

/// Analyze the built-in demo contract.
#[utoipa::path(
    post,
    path = "/analyze/demo",
    responses(
        (status = 202, description = "Analysis started", body = SessionResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 409, description = "An analysis is already in progress", body = ErrorResponse)
    )
)]
pub async fn analyze_demo_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let pending = state.app.run_demo().await.map_err(submit_rejection)?;
    tokio::spawn(pending.run());
    Ok((StatusCode::ACCEPTED, Json(SessionResponse(state.app.snapshot().await))))
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// The current session: state, status line, result or error, and any local error.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Entry screen not passed")
    )
)]
pub async fn get_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse(state.app.snapshot().await))
}

/// Start over: back to idle, discarding the result or error.
#[utoipa::path(
    post,
    path = "/session/reset",
    responses(
        (status = 200, description = "Session reset", body = SessionResponse),
        (status = 401, description = "Entry screen not passed")
    )
)]
pub async fn reset_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    state.app.reset().await;
    Json(SessionResponse(state.app.snapshot().await))
}

//=========================================================================================
// History Handlers
//=========================================================================================

/// List past analyses, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "Saved analyses", body = HistoryResponse),
        (status = 401, description = "Entry screen not passed")
    )
)]
pub async fn list_history_handler(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    Json(HistoryResponse(state.app.history().await))
}

/// Show a past analysis again without contacting the service.
#[utoipa::path(
    post,
    path = "/history/{id}/load",
    params(("id" = String, Path, description = "The history entry id.")),
    responses(
        (status = 200, description = "Entry loaded into the session", body = SessionResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 404, description = "No such entry", body = ErrorResponse),
        (status = 409, description = "An analysis is already in progress", body = ErrorResponse)
    )
)]
pub async fn load_history_entry_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    state.app.load_entry(&id).await.map_err(|e| match e {
        LoadEntryError::NotFound(_) => reject(StatusCode::NOT_FOUND, e.to_string()),
        LoadEntryError::Busy => reject(StatusCode::CONFLICT, e.to_string()),
    })?;
    Ok(Json(SessionResponse(state.app.snapshot().await)))
}

/// Delete every saved analysis. Nothing happens unless `confirm=true`.
#[utoipa::path(
    delete,
    path = "/history",
    params(("confirm" = Option<bool>, Query, description = "The user's answer to the confirmation prompt.")),
    responses(
        (status = 200, description = "Whether the history was cleared", body = ClearHistoryResponse),
        (status = 401, description = "Entry screen not passed"),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearHistoryParams>,
) -> ApiResult<Json<ClearHistoryResponse>> {
    let cleared = state
        .app
        .clear_history(Confirmation::from(params.confirm))
        .await
        .map_err(|e| {
            error!("Failed to clear history: {:?}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear history")
        })?;
    Ok(Json(ClearHistoryResponse {
        cleared,
        prompt: CLEAR_HISTORY_PROMPT.to_string(),
    }))
}
