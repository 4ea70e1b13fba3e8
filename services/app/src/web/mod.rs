pub mod entry;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use entry::{consent_handler, enter_handler, get_preferences_handler, leave_handler, toggle_theme_handler};
use middleware::require_entry;
use rest::{
    analyze_demo_handler, analyze_file_handler, analyze_text_handler, analyze_url_handler,
    clear_history_handler, get_session_handler, list_history_handler, load_history_entry_handler,
    reset_session_handler, ApiDoc,
};
use state::AppState;

/// Uploads are capped at 5 MB by the normalizer; leave room for the multipart framing
/// so moderately oversized files still reach it. Anything past this limit is
/// rejected by the file handler with the same local error.
pub(crate) const BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Builds the full application router, Swagger UI included.
pub fn router(state: Arc<AppState>) -> Router {
    // Open routes (entry screen, theme switch and cookie banner)
    let open_routes = Router::new()
        .route("/enter", post(enter_handler))
        .route("/leave", post(leave_handler))
        .route("/preferences", get(get_preferences_handler))
        .route("/preferences/theme/toggle", post(toggle_theme_handler))
        .route("/preferences/consent", post(consent_handler));

    // Gated routes (only after the entry screen)
    let gated_routes = Router::new()
        .route("/analyze/text", post(analyze_text_handler))
        .route("/analyze/url", post(analyze_url_handler))
        .route("/analyze/file", post(analyze_file_handler))
        .route("/analyze/demo", post(analyze_demo_handler))
        .route("/session", get(get_session_handler))
        .route("/session/reset", post(reset_session_handler))
        .route("/history", get(list_history_handler).delete(clear_history_handler))
        .route("/history/{id}/load", post(load_history_entry_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_entry));

    let api_router = Router::new()
        .merge(open_routes)
        .merge(gated_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
