//! crates/juriscan_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the analysis API, the document parser and the storage engine.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{AnalysisRequest, AnalysisResult};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A failure the remote service described in words the user can read.
    #[error("{0}")]
    Service(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The message that may be shown to the user, if the error carries one.
    pub fn display_message(&self) -> Option<&str> {
        match self {
            PortError::Service(message) if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Sends one normalized request and waits for the full result. No streaming.
    async fn analyze(&self, request: &AnalysisRequest) -> PortResult<AnalysisResult>;
}

#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// Extracts the raw text of a word-processing document.
    async fn extract_raw_text(&self, document: Bytes) -> PortResult<String>;
}

/// A local key-value store holding opaque serialized text.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}
