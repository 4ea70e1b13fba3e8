//! crates/juriscan_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! The serde field names match the records kept in local storage, so a
//! persisted history written by an older build still loads.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Analysis Request
//=========================================================================================

/// The normalized payload sent to the remote analysis service.
///
/// Exactly one variant is populated per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    /// Contract text, either pasted or extracted from a document.
    Text { text: String },
    /// A binary document or image. `data` holds the base64-encoded file content.
    File { data: String, media_type: String },
    /// A website to audit. Passed through exactly as the user typed it.
    Url { url: String },
}

impl AnalysisRequest {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::Url { .. } => AnalysisKind::WebAudit,
            AnalysisRequest::Text { .. } | AnalysisRequest::File { .. } => AnalysisKind::Document,
        }
    }
}

/// Which flavour of analysis a request asks for. Drives the loading status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Document,
    WebAudit,
}

//=========================================================================================
// Analysis Result
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Risk,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskCategory {
    /// Penalties, prices.
    Financial,
    /// Termination, notice periods.
    Termination,
    /// Liability, warranties.
    Liability,
    /// Personal data.
    Gdpr,
    Other,
}

/// One flagged clause produced by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// The excerpt from the source document.
    pub text: String,
    pub issue: String,
    pub explanation: String,
    pub recommendation: String,
    pub severity: Severity,
    /// Missing on records stored before categories existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RiskCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_reference: Option<String>,
}

/// A source the service consulted while verifying its findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    pub title: String,
    pub uri: String,
}

/// The aggregate returned by the analysis service. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 0 to 100, higher is safer.
    pub score: u8,
    pub summary: String,
    #[serde(default)]
    pub contract_highlights: Vec<String>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<WebSource>>,
}

//=========================================================================================
// History
//=========================================================================================

/// A persisted record of one completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub date_label: String,
    pub result: AnalysisResult,
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The two terminal answers to the cookie banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentChoice {
    Accepted,
    Rejected,
}

impl ConsentChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentChoice::Accepted => "accepted",
            ConsentChoice::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "accepted" => Some(ConsentChoice::Accepted),
            "rejected" => Some(ConsentChoice::Rejected),
            _ => None,
        }
    }
}

/// Tri-state cookie consent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieConsent {
    Unset,
    Accepted,
    Rejected,
}

impl From<ConsentChoice> for CookieConsent {
    fn from(choice: ConsentChoice) -> Self {
        match choice {
            ConsentChoice::Accepted => CookieConsent::Accepted,
            ConsentChoice::Rejected => CookieConsent::Rejected,
        }
    }
}
