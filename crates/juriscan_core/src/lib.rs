pub mod app;
pub mod domain;
pub mod history;
pub mod ingest;
pub mod ports;
pub mod preferences;
pub mod session;

#[cfg(test)]
mod test_support;

pub use app::{App, AppOptions, AppPorts, LoadEntryError, PendingAnalysis, PreferencesView, SessionSnapshot, SubmitError};
pub use domain::{AnalysisKind, AnalysisRequest, AnalysisResult, ConsentChoice, CookieConsent, Finding,
    HistoryEntry, RiskCategory, Severity, Theme, WebSource};
pub use history::Confirmation;
pub use ingest::{IngestError, UploadedFile, UserInput};
pub use ports::{AnalysisService, DocumentTextExtractor, KeyValueStore, PortError, PortResult};
