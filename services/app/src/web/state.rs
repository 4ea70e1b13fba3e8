//! services/app/src/web/state.rs
//!
//! Defines the state shared by every handler.

use juriscan_core::App;
use std::sync::Arc;

/// Created once at startup and passed to all handlers.
///
/// `app` is the single owner of the session, history and preferences; the
/// handlers only send it events and read snapshots back.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
}
