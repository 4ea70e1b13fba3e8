//! crates/juriscan_core/src/app.rs
//!
//! The single owner of all mutable application state: the session, the
//! history, the preferences and the transient upload error. Every change goes
//! through one of the methods below, one event at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::{
    AnalysisKind, AnalysisRequest, AnalysisResult, ConsentChoice, CookieConsent, HistoryEntry,
    Theme,
};
use crate::history::{Confirmation, HistoryStore, DEFAULT_HISTORY_LIMIT};
use crate::ingest::{
    IngestError, InputNormalizer, TransientError, UserInput, DEMO_CONTRACT_TEXT, MAX_FILE_SIZE,
};
use crate::ports::{AnalysisService, DocumentTextExtractor, KeyValueStore, PortResult};
use crate::preferences::Preferences;
use crate::session::{Session, SessionState, Ticket, TICKER_INTERVAL};

//=========================================================================================
// Construction
//=========================================================================================

/// The collaborators the application talks to.
#[derive(Clone)]
pub struct AppPorts {
    pub analysis: Arc<dyn AnalysisService>,
    pub extractor: Arc<dyn DocumentTextExtractor>,
    pub store: Arc<dyn KeyValueStore>,
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub os_prefers_dark: bool,
    /// `None` keeps every entry.
    pub history_limit: Option<usize>,
    pub ticker_interval: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            os_prefers_dark: false,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            ticker_interval: TICKER_INTERVAL,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("An analysis is already in progress")]
    Busy,
    #[error(transparent)]
    Local(#[from] IngestError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadEntryError {
    #[error("No history entry with id {0}")]
    NotFound(String),
    #[error("An analysis is already in progress")]
    Busy,
}

struct AppModel {
    session: Session,
    history: HistoryStore,
    preferences: Preferences,
    upload_error: Option<TransientError>,
    entered: bool,
}

pub struct App {
    model: Mutex<AppModel>,
    normalizer: InputNormalizer,
    analysis: Arc<dyn AnalysisService>,
}

//=========================================================================================
// Read-only Views
//=========================================================================================

/// What the surface renders for the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AnalysisKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_line: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub theme: Theme,
    pub dark: bool,
    pub cookie_consent: CookieConsent,
    pub show_consent_banner: bool,
}

//=========================================================================================
// The Application
//=========================================================================================

impl App {
    /// Loads history and preferences from the store. Never fails: unreadable
    /// persisted data degrades to defaults.
    pub async fn start(ports: AppPorts, options: AppOptions) -> Arc<Self> {
        let history = HistoryStore::load(ports.store.clone(), options.history_limit).await;
        let preferences = Preferences::load(ports.store.clone(), options.os_prefers_dark).await;
        info!(
            history = history.len(),
            theme = preferences.theme().as_str(),
            "Application state loaded."
        );

        Arc::new(Self {
            model: Mutex::new(AppModel {
                session: Session::new(options.ticker_interval),
                history,
                preferences,
                upload_error: None,
                entered: false,
            }),
            normalizer: InputNormalizer::new(ports.extractor),
            analysis: ports.analysis,
        })
    }

    // --- Entry gate ---

    pub async fn enter(&self) {
        self.model.lock().await.entered = true;
    }

    pub async fn leave(&self) {
        let mut model = self.model.lock().await;
        model.entered = false;
        model.session.reset();
        model.upload_error = None;
    }

    pub async fn is_entered(&self) -> bool {
        self.model.lock().await.entered
    }

    // --- Analysis session ---

    /// Normalizes the input and moves the session to `Loading`.
    ///
    /// Local errors are recorded as the transient upload error and leave the
    /// session untouched. The returned `PendingAnalysis` performs the single
    /// outbound call.
    pub async fn submit(self: &Arc<Self>, input: UserInput) -> Result<PendingAnalysis, SubmitError> {
        {
            let mut model = self.model.lock().await;
            if model.session.is_loading() {
                return Err(SubmitError::Busy);
            }
            model.upload_error = None;
        }

        let request = match self.normalizer.normalize(input).await {
            Ok(request) => request,
            Err(e) => {
                info!("Input rejected locally: {}", e);
                self.model.lock().await.upload_error =
                    Some(TransientError::raised_at(&e, Instant::now()));
                return Err(e.into());
            }
        };

        let ticket = self
            .model
            .lock()
            .await
            .session
            .begin(request.kind())
            .map_err(|_| SubmitError::Busy)?;

        Ok(PendingAnalysis {
            app: self.clone(),
            ticket,
            request,
        })
    }

    /// Submits the built-in demo contract as pasted text.
    pub async fn run_demo(self: &Arc<Self>) -> Result<PendingAnalysis, SubmitError> {
        self.submit(UserInput::Text(DEMO_CONTRACT_TEXT.to_string())).await
    }

    /// Records an upload the surface gave up reading because it was larger
    /// than the transport allows. Same outcome as `FileTooLarge` from `submit`.
    pub async fn reject_oversized_upload(&self, size: u64) -> SubmitError {
        let mut model = self.model.lock().await;
        if model.session.is_loading() {
            return SubmitError::Busy;
        }
        let error = IngestError::FileTooLarge { size: size.max(MAX_FILE_SIZE + 1) };
        info!("Input rejected locally: {}", error);
        model.upload_error = Some(TransientError::raised_at(&error, Instant::now()));
        error.into()
    }

    pub async fn reset(&self) {
        let mut model = self.model.lock().await;
        model.session.reset();
        model.upload_error = None;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let model = self.model.lock().await;
        let now = Instant::now();
        let upload_error = model
            .upload_error
            .as_ref()
            .filter(|e| e.is_visible(now))
            .map(|e| e.message.clone());

        let (kind, result, error) = match model.session.state() {
            SessionState::Idle => (None, None, None),
            SessionState::Loading { kind } => (Some(*kind), None, None),
            SessionState::Succeeded(result) => (None, Some(result.clone()), None),
            SessionState::Failed(message) => (None, None, Some(message.clone())),
        };

        SessionSnapshot {
            state: model.session.state().name(),
            kind,
            status_line: model.session.status_line(),
            result,
            error,
            upload_error,
        }
    }

    // --- History ---

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.model.lock().await.history.entries().to_vec()
    }

    /// Shows a past result again without contacting the service.
    pub async fn load_entry(&self, id: &str) -> Result<AnalysisResult, LoadEntryError> {
        let mut model = self.model.lock().await;
        let result = model
            .history
            .get(id)
            .map(|entry| entry.result.clone())
            .ok_or_else(|| LoadEntryError::NotFound(id.to_string()))?;
        model
            .session
            .restore(result.clone())
            .map_err(|_| LoadEntryError::Busy)?;
        Ok(result)
    }

    pub async fn clear_history(&self, confirmation: Confirmation) -> PortResult<bool> {
        self.model.lock().await.history.clear(confirmation).await
    }

    // --- Preferences ---

    pub async fn preferences(&self) -> PreferencesView {
        let model = self.model.lock().await;
        view_of(&model.preferences)
    }

    pub async fn toggle_theme(&self) -> PortResult<PreferencesView> {
        let mut model = self.model.lock().await;
        model.preferences.toggle_theme().await?;
        Ok(view_of(&model.preferences))
    }

    /// Returns `None` when a choice had already been recorded.
    pub async fn record_consent(&self, choice: ConsentChoice) -> PortResult<Option<PreferencesView>> {
        let mut model = self.model.lock().await;
        let recorded = model.preferences.record_consent(choice).await?;
        Ok(recorded.then(|| view_of(&model.preferences)))
    }
}

fn view_of(preferences: &Preferences) -> PreferencesView {
    PreferencesView {
        theme: preferences.theme(),
        dark: preferences.is_dark(),
        cookie_consent: preferences.consent(),
        show_consent_banner: preferences.show_consent_banner(),
    }
}

//=========================================================================================
// The In-flight Request
//=========================================================================================

/// One accepted submission, waiting to be sent.
pub struct PendingAnalysis {
    app: Arc<App>,
    ticket: Ticket,
    request: AnalysisRequest,
}

impl PendingAnalysis {
    /// Sends the request and resolves the session with the outcome.
    ///
    /// A successful result is recorded in the history even if the user reset
    /// the session while waiting; it just no longer replaces what is shown.
    pub async fn run(self) {
        let outcome = self.app.analysis.analyze(&self.request).await;
        let mut model = self.app.model.lock().await;

        match outcome {
            Ok(result) => {
                if let Err(e) = model.session.succeed(self.ticket, result.clone()) {
                    debug!("Result not shown: {}", e);
                }
                let (entry, persisted) = model.history.append(result).await;
                if let Err(e) = persisted {
                    error!(id = %entry.id, "Failed to persist history: {}", e);
                }
            }
            Err(e) => {
                warn!("Analysis service call failed: {}", e);
                let message = e.display_message().map(str::to_string);
                if let Err(e) = model.session.fail(self.ticket, message) {
                    debug!("Failure not shown: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{UploadedFile, DOCX_MEDIA_TYPE, LOCAL_ERROR_TTL};
    use crate::session::{GENERIC_FAILURE_MESSAGE, LOADING_STEPS_DOC};
    use crate::test_support::{sample_result, MemoryStore, StubAnalysis, StubExtractor};
    use bytes::Bytes;

    async fn app_with(analysis: Arc<StubAnalysis>, extracted: Option<&str>) -> Arc<App> {
        let ports = AppPorts {
            analysis,
            extractor: Arc::new(StubExtractor(extracted.map(str::to_string))),
            store: Arc::new(MemoryStore::default()),
        };
        App::start(ports, AppOptions::default()).await
    }

    async fn analyze_now(app: &Arc<App>, input: UserInput) -> SessionSnapshot {
        app.submit(input).await.unwrap().run().await;
        app.snapshot().await
    }

    #[tokio::test]
    async fn successful_text_analysis_is_shown_and_recorded() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service.clone(), None).await;

        let snapshot =
            analyze_now(&app, UserInput::Text("Art. 4. Prețul serviciilor.".to_string())).await;

        assert_eq!(snapshot.state, "succeeded");
        assert_eq!(snapshot.result, Some(sample_result(42)));
        assert_eq!(app.history().await.len(), 1);
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn each_success_grows_history_by_one() {
        let service = Arc::new(StubAnalysis::returning(sample_result(80)));
        let app = app_with(service, None).await;
        for n in 1..=3 {
            analyze_now(&app, UserInput::Url("https://magazin.ro".to_string())).await;
            assert_eq!(app.history().await.len(), n);
        }
    }

    #[tokio::test]
    async fn service_failure_shows_its_message() {
        let service = Arc::new(StubAnalysis::failing("Cheia API este invalidă."));
        let app = app_with(service, None).await;
        let snapshot = analyze_now(&app, UserInput::Text("Art. 1".to_string())).await;
        assert_eq!(snapshot.state, "failed");
        assert_eq!(snapshot.error.as_deref(), Some("Cheia API este invalidă."));
        assert!(app.history().await.is_empty());
    }

    #[tokio::test]
    async fn silent_service_failure_uses_generic_message() {
        let service = Arc::new(StubAnalysis::failing(""));
        let app = app_with(service, None).await;
        let snapshot = analyze_now(&app, UserInput::Text("Art. 1".to_string())).await;
        assert_eq!(snapshot.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_image_is_rejected_locally() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service.clone(), None).await;
        let upload = UploadedFile {
            name: "scan.png".to_string(),
            media_type: "image/png".to_string(),
            size: 6 * 1024 * 1024,
            bytes: Bytes::new(),
        };

        let err = app.submit(UserInput::File(upload)).await.err().unwrap();
        assert!(matches!(err, SubmitError::Local(IngestError::FileTooLarge { .. })));

        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.state, "idle");
        assert!(snapshot.upload_error.unwrap().starts_with("Fișier prea mare"));
        assert!(app.history().await.is_empty());
        assert_eq!(service.call_count(), 0);

        tokio::time::advance(LOCAL_ERROR_TTL).await;
        assert_eq!(app.snapshot().await.upload_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_cut_off_by_the_transport_is_a_local_error() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service.clone(), None).await;

        let err = app.reject_oversized_upload(9 * 1024 * 1024).await;
        assert!(matches!(err, SubmitError::Local(IngestError::FileTooLarge { .. })));
        assert_eq!(err.to_string(), "Fișier prea mare (9.00MB). Limita: 5MB.");

        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.state, "idle");
        assert_eq!(snapshot.upload_error.as_deref(), Some("Fișier prea mare (9.00MB). Limita: 5MB."));
        assert_eq!(service.call_count(), 0);

        tokio::time::advance(LOCAL_ERROR_TTL).await;
        assert_eq!(app.snapshot().await.upload_error, None);
    }

    #[tokio::test]
    async fn oversized_upload_while_loading_is_busy() {
        let service = Arc::new(StubAnalysis::gated(sample_result(42)));
        let app = app_with(service.clone(), None).await;
        let pending = app.submit(UserInput::Text("Art. 1".to_string())).await.unwrap();

        assert!(matches!(app.reject_oversized_upload(9 * 1024 * 1024).await, SubmitError::Busy));
        assert_eq!(app.snapshot().await.upload_error, None);

        service.release();
        pending.run().await;
    }

    #[tokio::test]
    async fn empty_docx_never_reaches_the_service() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service.clone(), Some("   ")).await;
        let upload = UploadedFile::new("gol.docx", DOCX_MEDIA_TYPE, Bytes::from_static(b"PK"));

        let err = app.submit(UserInput::File(upload)).await.err().unwrap();
        assert!(matches!(err, SubmitError::Local(IngestError::EmptyDocument)));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn local_error_keeps_the_previous_result() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service, None).await;
        analyze_now(&app, UserInput::Text("Art. 1".to_string())).await;

        let _ = app.submit(UserInput::Text(String::new())).await;
        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.state, "succeeded");
        assert!(snapshot.upload_error.is_some());
    }

    #[tokio::test]
    async fn submission_while_loading_is_refused() {
        let service = Arc::new(StubAnalysis::gated(sample_result(42)));
        let app = app_with(service.clone(), None).await;

        let pending = app.submit(UserInput::Text("Art. 1".to_string())).await.unwrap();
        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.state, "loading");
        assert_eq!(snapshot.kind, Some(AnalysisKind::Document));
        assert_eq!(snapshot.status_line, Some(LOADING_STEPS_DOC[0]));

        assert!(matches!(
            app.submit(UserInput::Text("Art. 2".to_string())).await,
            Err(SubmitError::Busy)
        ));

        service.release();
        pending.run().await;
        assert_eq!(app.snapshot().await.state, "succeeded");
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn reset_while_loading_keeps_the_late_result_out_of_view() {
        let service = Arc::new(StubAnalysis::gated(sample_result(42)));
        let app = app_with(service.clone(), None).await;

        let pending = app.submit(UserInput::Text("Art. 1".to_string())).await.unwrap();
        app.reset().await;
        service.release();
        pending.run().await;

        assert_eq!(app.snapshot().await.state, "idle");
        assert_eq!(app.history().await.len(), 1);
    }

    #[tokio::test]
    async fn demo_sends_the_demo_contract() {
        let service = Arc::new(StubAnalysis::returning(sample_result(35)));
        let app = app_with(service.clone(), None).await;
        app.run_demo().await.unwrap().run().await;
        assert_eq!(
            service.last_request.lock().unwrap().clone(),
            Some(AnalysisRequest::Text { text: DEMO_CONTRACT_TEXT.to_string() })
        );
    }

    #[tokio::test]
    async fn history_entry_can_be_reloaded_without_the_service() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service.clone(), None).await;
        analyze_now(&app, UserInput::Text("Art. 1".to_string())).await;
        app.reset().await;

        let id = app.history().await[0].id.clone();
        let result = app.load_entry(&id).await.unwrap();
        assert_eq!(result.score, 42);
        assert_eq!(app.snapshot().await.state, "succeeded");
        assert_eq!(service.call_count(), 1);

        assert!(matches!(app.load_entry("nope").await, Err(LoadEntryError::NotFound(_))));
    }

    #[tokio::test]
    async fn clear_history_needs_confirmation() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service, None).await;
        analyze_now(&app, UserInput::Text("Art. 1".to_string())).await;

        assert!(!app.clear_history(Confirmation::Declined).await.unwrap());
        assert_eq!(app.history().await.len(), 1);
        assert!(app.clear_history(Confirmation::Confirmed).await.unwrap());
        assert!(app.history().await.is_empty());
    }

    #[tokio::test]
    async fn preferences_round_trip_through_the_app() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service, None).await;

        let before = app.preferences().await;
        assert!(before.show_consent_banner);
        let toggled = app.toggle_theme().await.unwrap();
        assert_ne!(toggled.theme, before.theme);
        assert_eq!(app.toggle_theme().await.unwrap().theme, before.theme);

        let view = app.record_consent(ConsentChoice::Accepted).await.unwrap().unwrap();
        assert!(!view.show_consent_banner);
        assert_eq!(app.record_consent(ConsentChoice::Rejected).await.unwrap(), None);
    }

    #[tokio::test]
    async fn entry_gate_toggles() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service, None).await;
        assert!(!app.is_entered().await);
        app.enter().await;
        assert!(app.is_entered().await);
        app.leave().await;
        assert!(!app.is_entered().await);
    }

    #[tokio::test]
    async fn leaving_clears_the_upload_error() {
        let service = Arc::new(StubAnalysis::returning(sample_result(42)));
        let app = app_with(service, None).await;
        app.enter().await;
        let _ = app.submit(UserInput::Text(String::new())).await;
        assert!(app.snapshot().await.upload_error.is_some());

        app.leave().await;
        let snapshot = app.snapshot().await;
        assert_eq!(snapshot.state, "idle");
        assert_eq!(snapshot.upload_error, None);
    }
}
