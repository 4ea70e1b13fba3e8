//! crates/juriscan_core/src/session.rs
//!
//! The lifecycle of one analysis attempt, and the status ticker that runs
//! while a request is in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{AnalysisKind, AnalysisResult};

/// Shown when a failed request carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Nu am putut finaliza analiza. Vă rog verificați datele și încercați din nou.";

pub const TICKER_INTERVAL: Duration = Duration::from_secs(2);

pub const LOADING_STEPS_DOC: &[&str] = &[
    "Inițializez motorul de analiză semantică V4.0...",
    "Verific Legea 193/2000 pentru clauze abuzive...",
    "Validez conformitatea cu Noul Cod Civil și OUG 34/2014...",
    "Identific limitările de răspundere și penalitățile excesive...",
    "Scanez documentul pentru conformitate GDPR...",
    "Generez recomandări legale bazate pe jurisprudența RO...",
];

pub const LOADING_STEPS_WEB: &[&str] = &[
    "V4.0: Inițializez crawler-ul pentru structura legală...",
    "Verific existența link-urilor obligatorii ANPC & SOL (Ord. 449/2022)...",
    "Analizez transparența reducerilor de preț (Directiva Omnibus)...",
    "Verific identitatea fiscală (CUI, Reg. Com) în footer (Lg. 365/2002)...",
    "Detectez Dark Patterns interzise de Digital Services Act (DSA)...",
    "Validez politica de retur și formularul de retragere...",
    "Analizez conformitatea bannerului CMP Cookies (ePrivacy)...",
    "Calculez scorul de încredere E-commerce...",
];

pub fn loading_steps(kind: AnalysisKind) -> &'static [&'static str] {
    match kind {
        AnalysisKind::Document => LOADING_STEPS_DOC,
        AnalysisKind::WebAudit => LOADING_STEPS_WEB,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("An analysis is already in progress")]
    AlreadyInFlight,
    #[error("The analysis outcome belongs to an attempt that is no longer current")]
    StaleTicket,
}

/// Identifies one submission. Outcomes are accepted only for the current ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Loading { kind: AnalysisKind },
    Succeeded(AnalysisResult),
    Failed(String),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading { .. } => "loading",
            SessionState::Succeeded(_) => "succeeded",
            SessionState::Failed(_) => "failed",
        }
    }
}

//=========================================================================================
// Status Ticker
//=========================================================================================

/// Advances through the loading lines on a fixed interval until cancelled.
///
/// The task is bound to the `Loading` state: it is started on entry and
/// cancelled on every exit, including when the ticker itself is dropped.
pub struct StatusTicker {
    steps: &'static [&'static str],
    position: Arc<AtomicUsize>,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusTicker {
    /// Spawns the ticker task. Must be called from within a tokio runtime.
    pub fn start(kind: AnalysisKind, interval: Duration) -> Self {
        let steps = loading_steps(kind);
        let position = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let first_tick = tokio::time::Instant::now() + interval;
        let task_position = position.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(first_tick, interval);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticks.tick() => {
                        let next = (task_position.load(Ordering::Relaxed) + 1) % steps.len();
                        task_position.store(next, Ordering::Relaxed);
                    }
                }
            }
            debug!("Status ticker stopped.");
        });

        Self { steps, position, token, handle }
    }

    pub fn current(&self) -> &'static str {
        self.steps[self.position.load(Ordering::Relaxed) % self.steps.len()]
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

//=========================================================================================
// Session State Machine
//=========================================================================================

/// Tracks `idle -> loading -> (succeeded | failed) -> idle`.
///
/// At most one request is in flight: `begin` refuses while loading.
pub struct Session {
    state: SessionState,
    ticker: Option<StatusTicker>,
    ticker_interval: Duration,
    next_ticket: u64,
    current: Option<Ticket>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(TICKER_INTERVAL)
    }
}

impl Session {
    pub fn new(ticker_interval: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            ticker: None,
            ticker_interval,
            next_ticket: 0,
            current: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading { .. })
    }

    /// Enters `Loading`, discarding any previous result or error.
    pub fn begin(&mut self, kind: AnalysisKind) -> Result<Ticket, SessionError> {
        if self.is_loading() {
            return Err(SessionError::AlreadyInFlight);
        }
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.current = Some(ticket);
        self.state = SessionState::Loading { kind };
        self.ticker = Some(StatusTicker::start(kind, self.ticker_interval));
        info!(?kind, "Analysis started.");
        Ok(ticket)
    }

    pub fn succeed(&mut self, ticket: Ticket, result: AnalysisResult) -> Result<(), SessionError> {
        self.settle(ticket)?;
        info!(score = result.score, "Analysis succeeded.");
        self.state = SessionState::Succeeded(result);
        Ok(())
    }

    /// Records a failure. A missing or blank message becomes the generic retry prompt.
    pub fn fail(&mut self, ticket: Ticket, message: Option<String>) -> Result<(), SessionError> {
        self.settle(ticket)?;
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        info!(%message, "Analysis failed.");
        self.state = SessionState::Failed(message);
        Ok(())
    }

    /// Returns to `Idle` from any state.
    pub fn reset(&mut self) {
        self.stop_ticker();
        self.current = None;
        self.state = SessionState::Idle;
    }

    /// Shows a stored result without contacting the service. Refused while loading.
    pub fn restore(&mut self, result: AnalysisResult) -> Result<(), SessionError> {
        if self.is_loading() {
            return Err(SessionError::AlreadyInFlight);
        }
        self.state = SessionState::Succeeded(result);
        Ok(())
    }

    /// The loading line currently displayed, while loading.
    pub fn status_line(&self) -> Option<&'static str> {
        match self.state {
            SessionState::Loading { .. } => self.ticker.as_ref().map(StatusTicker::current),
            _ => None,
        }
    }

    fn settle(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        if !self.is_loading() || self.current != Some(ticket) {
            return Err(SessionError::StaleTicket);
        }
        self.stop_ticker();
        self.current = None;
        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_result;

    async fn advance(by: Duration) {
        tokio::time::advance(by).await;
        // Let the ticker task observe the new time.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn starts_idle() {
        let session = Session::default();
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.status_line(), None);
    }

    #[tokio::test]
    async fn success_path() {
        let mut session = Session::default();
        let ticket = session.begin(AnalysisKind::Document).unwrap();
        assert_eq!(session.state().name(), "loading");
        session.succeed(ticket, sample_result(42)).unwrap();
        assert_eq!(session.state(), &SessionState::Succeeded(sample_result(42)));
        session.reset();
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn failure_without_message_uses_generic_prompt() {
        let mut session = Session::default();
        let ticket = session.begin(AnalysisKind::Document).unwrap();
        session.fail(ticket, Some("   ".to_string())).unwrap();
        assert_eq!(
            session.state(),
            &SessionState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn failure_keeps_service_message() {
        let mut session = Session::default();
        let ticket = session.begin(AnalysisKind::WebAudit).unwrap();
        session.fail(ticket, Some("Site inaccesibil".to_string())).unwrap();
        assert_eq!(session.state(), &SessionState::Failed("Site inaccesibil".to_string()));
    }

    #[tokio::test]
    async fn second_submission_while_loading_is_refused() {
        let mut session = Session::default();
        session.begin(AnalysisKind::Document).unwrap();
        assert_eq!(session.begin(AnalysisKind::Document), Err(SessionError::AlreadyInFlight));
        assert_eq!(session.restore(sample_result(1)), Err(SessionError::AlreadyInFlight));
    }

    #[tokio::test]
    async fn outcomes_require_loading_and_the_current_ticket() {
        let mut session = Session::default();
        let first = session.begin(AnalysisKind::Document).unwrap();
        session.reset();
        assert_eq!(session.succeed(first, sample_result(10)), Err(SessionError::StaleTicket));

        let second = session.begin(AnalysisKind::Document).unwrap();
        assert_eq!(session.fail(first, None), Err(SessionError::StaleTicket));
        assert!(session.is_loading());
        session.succeed(second, sample_result(10)).unwrap();
        assert_eq!(session.succeed(second, sample_result(10)), Err(SessionError::StaleTicket));
    }

    #[tokio::test]
    async fn resubmission_after_failure_clears_the_error() {
        let mut session = Session::default();
        let ticket = session.begin(AnalysisKind::Document).unwrap();
        session.fail(ticket, None).unwrap();
        session.begin(AnalysisKind::Document).unwrap();
        assert_eq!(session.state(), &SessionState::Loading { kind: AnalysisKind::Document });
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_cycles_document_steps() {
        let mut session = Session::default();
        session.begin(AnalysisKind::Document).unwrap();
        assert_eq!(session.status_line(), Some(LOADING_STEPS_DOC[0]));

        advance(TICKER_INTERVAL).await;
        assert_eq!(session.status_line(), Some(LOADING_STEPS_DOC[1]));

        advance(TICKER_INTERVAL * (LOADING_STEPS_DOC.len() as u32 - 1)).await;
        assert_eq!(session.status_line(), Some(LOADING_STEPS_DOC[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn url_audits_use_web_steps() {
        let mut session = Session::default();
        session.begin(AnalysisKind::WebAudit).unwrap();
        assert_eq!(session.status_line(), Some(LOADING_STEPS_WEB[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_stops_when_loading_ends() {
        let ticker = StatusTicker::start(AnalysisKind::Document, TICKER_INTERVAL);
        advance(TICKER_INTERVAL).await;
        assert_eq!(ticker.current(), LOADING_STEPS_DOC[1]);

        ticker.cancel();
        advance(Duration::from_millis(1)).await;
        assert!(ticker.is_finished());

        advance(TICKER_INTERVAL * 3).await;
        assert_eq!(ticker.current(), LOADING_STEPS_DOC[1]);
    }
}
