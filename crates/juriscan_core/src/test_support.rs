//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::domain::{AnalysisRequest, AnalysisResult, Finding, RiskCategory, Severity};
use crate::ports::{AnalysisService, DocumentTextExtractor, KeyValueStore, PortError, PortResult};

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.values.lock().unwrap().insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("quota exceeded".to_string()));
        }
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("storage unavailable".to_string()));
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Answers every request with a fixed outcome and records what it was sent.
pub struct StubAnalysis {
    outcome: Mutex<Result<AnalysisResult, String>>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<AnalysisRequest>>,
    /// When set, `analyze` waits for `release` before answering.
    pub gate: Option<Notify>,
}

impl StubAnalysis {
    pub fn returning(result: AnalysisResult) -> Self {
        Self {
            outcome: Mutex::new(Ok(result)),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Mutex::new(Err(message.to_string())),
            ..Self::returning(sample_result(0))
        }
    }

    pub fn gated(result: AnalysisResult) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::returning(result)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for StubAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> PortResult<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.lock().unwrap().clone().map_err(PortError::Service)
    }
}

/// Returns a canned extraction, or fails as a corrupt archive would.
pub struct StubExtractor(pub Option<String>);

#[async_trait]
impl DocumentTextExtractor for StubExtractor {
    async fn extract_raw_text(&self, _document: Bytes) -> PortResult<String> {
        self.0
            .clone()
            .ok_or_else(|| PortError::Unexpected("invalid zip archive".to_string()))
    }
}

pub fn sample_result(score: u8) -> AnalysisResult {
    AnalysisResult {
        score,
        summary: "Contractul conține clauze abuzive.".to_string(),
        contract_highlights: vec!["Durata minimă: 24 luni".to_string()],
        findings: vec![Finding {
            text: "Art. 4. Prestatorul își rezervă dreptul de a modifica tarifele lunar".to_string(),
            issue: "Modificare unilaterală a prețului".to_string(),
            explanation: "Prețul poate crește fără acordul dumneavoastră.".to_string(),
            recommendation: "Cereți notificare cu 30 de zile înainte.".to_string(),
            severity: Severity::Critical,
            category: Some(RiskCategory::Financial),
            law_reference: Some("Legea 193/2000, Anexa 1".to_string()),
        }],
        sources: None,
    }
}
