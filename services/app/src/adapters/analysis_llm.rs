//! services/app/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the contract-analysis LLM.
//! It implements the `AnalysisService` port from the `core` crate against any
//! OpenAI-compatible chat-completions endpoint (OpenAI itself, or Gemini's
//! compatibility layer).

const SYSTEM_INSTRUCTIONS: &str = r#"You are JuriScan, a Romanian consumer-law assistant reviewing contracts and websites for a non-lawyer.

Check the material against Romanian law, in particular:
- Legea 193/2000 on abusive clauses in consumer contracts (and its Annex),
- the Civil Code (Noul Cod Civil),
- OUG 34/2014 on consumer rights in distance contracts,
- GDPR (Regulation 2016/679) for personal-data clauses.

Write every human-readable field in Romanian, in plain language.

Respond with ONE JSON object and nothing else, with this exact shape:
{
  "score": <integer 0-100, higher means safer for the consumer>,
  "summary": "<two or three sentences>",
  "contractHighlights": ["<factual key point: parties, duration, price, notice periods>", ...],
  "findings": [
    {
      "text": "<verbatim excerpt of the clause>",
      "issue": "<short title of the problem>",
      "explanation": "<why it matters, in plain language>",
      "recommendation": "<what the user should ask for or do>",
      "severity": "CRITICAL" | "RISK" | "SAFE",
      "category": "FINANCIAL" | "TERMINATION" | "LIABILITY" | "GDPR" | "OTHER",
      "lawReference": "<article and law, if any>"
    }
  ],
  "sources": [{"title": "<official source>", "uri": "<url>"}]
}"#;

const DOCUMENT_TASK: &str = "Analyze the following contract. Flag abusive or risky clauses and also list clauses that are fair (severity SAFE).";

const WEB_AUDIT_TASK: &str = r#"Audit the e-commerce website at the URL below for Romanian and EU compliance:
- mandatory ANPC and SOL links (Ord. 449/2022),
- price-reduction transparency (Omnibus Directive),
- fiscal identity (CUI, trade register number) in the footer (Lg. 365/2002),
- dark patterns prohibited by the Digital Services Act,
- return policy and withdrawal form (OUG 34/2014),
- the cookie consent banner (ePrivacy).
Each problem is a finding; "text" quotes or describes the page element. The score is the store's trust score."#;

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use async_trait::async_trait;
use juriscan_core::{
    domain::{AnalysisRequest, AnalysisResult, Finding, WebSource},
    ports::{AnalysisService, PortError, PortResult},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the chat-completions body for one request.
    fn build_request(&self, request: &AnalysisRequest) -> Value {
        let content = match request {
            AnalysisRequest::Text { text } => json!([
                { "type": "text", "text": format!("{}\n\nCONTRACT:\n---\n{}\n---", DOCUMENT_TASK, text) }
            ]),
            AnalysisRequest::File { data, media_type } if media_type.starts_with("image/") => json!([
                { "type": "text", "text": format!("{} The contract is in the attached image.", DOCUMENT_TASK) },
                { "type": "image_url", "image_url": { "url": format!("data:{};base64,{}", media_type, data) } }
            ]),
            AnalysisRequest::File { data, media_type } => json!([
                { "type": "text", "text": format!("{} The contract is in the attached document.", DOCUMENT_TASK) },
                { "type": "file", "file": {
                    "filename": "contract.pdf",
                    "file_data": format!("data:{};base64,{}", media_type, data)
                } }
            ]),
            AnalysisRequest::Url { url } => json!([
                { "type": "text", "text": format!("{}\n\nURL: {}", WEB_AUDIT_TASK, url) }
            ]),
        };

        json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTIONS },
                { "role": "user", "content": content }
            ]
        })
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// The model's JSON answer. Lenient where models tend to drift.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload {
    score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    contract_highlights: Vec<String>,
    #[serde(default)]
    findings: Vec<Finding>,
    #[serde(default)]
    sources: Vec<WebSource>,
}

impl AnalysisPayload {
    fn into_domain(self) -> AnalysisResult {
        AnalysisResult {
            score: self.score.round().clamp(0.0, 100.0) as u8,
            summary: self.summary,
            contract_highlights: self.contract_highlights,
            findings: self.findings,
            sources: (!self.sources.is_empty()).then_some(self.sources),
        }
    }
}

/// Parses the assistant message, tolerating a Markdown code fence around the JSON.
fn parse_analysis(content: &str) -> PortResult<AnalysisResult> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    let payload: AnalysisPayload = serde_json::from_str(body.trim())
        .map_err(|e| PortError::Unexpected(format!("Malformed analysis JSON: {}", e)))?;
    Ok(payload.into_domain())
}

/// Maps a client error to a port error. API-side rejections carry a message
/// worth showing; transport and decoding failures do not.
fn map_client_error(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => PortError::Service(api.message),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// `AnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisService for OpenAiAnalysisAdapter {
    async fn analyze(&self, request: &AnalysisRequest) -> PortResult<AnalysisResult> {
        info!(kind = ?request.kind(), model = %self.model, "Sending analysis request.");
        let body = self.build_request(request);

        let response: ChatCompletion = self
            .client
            .chat()
            .create_byot(body)
            .await
            .map_err(map_client_error)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Analysis LLM response contained no text content.".to_string())
            })?;
        debug!(chars = content.len(), "Analysis response received.");

        parse_analysis(&content)
    }
}
