//! crates/juriscan_core/src/ingest.rs
//!
//! The input normalizer. Turns pasted text, an uploaded file or a URL into the
//! single `AnalysisRequest` shape the analysis service understands. Every
//! rejection here is local: nothing is sent to the service.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::AnalysisRequest;
use crate::ports::DocumentTextExtractor;

/// Uploads above this size are refused before they are read.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Cap on pasted contract text, in characters.
pub const MAX_TEXT_CHARS: usize = 100_000;

/// How long a local error stays visible.
pub const LOCAL_ERROR_TTL: Duration = Duration::from_secs(3);

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Submitted by "run demo" exactly as if it had been pasted.
pub const DEMO_CONTRACT_TEXT: &str = "CONTRACT DE PRESTĂRI SERVICII INTERNET

Art. 4. Prețul serviciilor.
Prestatorul își rezervă dreptul de a modifica tarifele lunar, fără a notifica clientul în prealabil. Continuarea utilizării serviciilor reprezintă acceptarea tacită a noilor tarife.

Art. 7. Rezilierea.
Clientul poate rezilia contractul doar prin achitarea unei taxe de reziliere echivalente cu valoarea abonamentului pe 24 de luni.

Art. 9. Răspunderea.
Prestatorul nu este răspunzător pentru nicio întrerupere a serviciului, indiferent de durată sau cauză, inclusiv din culpa sa exclusivă.

Art. 12. Penalități.
Pentru orice întârziere la plată, se aplică penalități de 1% pe zi din valoarea facturii totale.";

/// Extensions offered by the file picker.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf", "docx", "txt"];

//=========================================================================================
// Input and Error Types
//=========================================================================================

/// A file as handed over by the upload surface.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// The declared media type. May be empty when the surface could not tell.
    pub media_type: String,
    /// The declared size in bytes.
    pub size: u64,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }
}

/// One of the three input modes.
#[derive(Debug, Clone)]
pub enum UserInput {
    Text(String),
    Url(String),
    File(UploadedFile),
}

/// Local validation failures. The messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("Fișier prea mare ({:.2}MB). Limita: 5MB.", megabytes(.size))]
    FileTooLarge { size: u64 },
    #[error("Format fișier neacceptat. Încearcă PDF, Word sau Imagini.")]
    UnsupportedFormat { media_type: String },
    #[error("Document Word gol sau necitibil.")]
    EmptyDocument,
    #[error("Fișier Word corupt.")]
    CorruptDocument,
    #[error("Fișierul text este gol.")]
    EmptyTextFile,
    #[error("Nu ați furnizat niciun conținut pentru analiză.")]
    EmptyInput,
    #[error("Textul depășește limita de 100.000 de caractere ({chars}).")]
    TextTooLong { chars: usize },
}

fn megabytes(size: &u64) -> f64 {
    *size as f64 / 1024.0 / 1024.0
}

/// A local error that disappears on its own after `LOCAL_ERROR_TTL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientError {
    pub message: String,
    pub expires_at: Instant,
}

impl TransientError {
    pub fn raised_at(error: &IngestError, now: Instant) -> Self {
        Self {
            message: error.to_string(),
            expires_at: now + LOCAL_ERROR_TTL,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

//=========================================================================================
// The Normalizer
//=========================================================================================

#[derive(Clone)]
pub struct InputNormalizer {
    extractor: Arc<dyn DocumentTextExtractor>,
}

impl InputNormalizer {
    pub fn new(extractor: Arc<dyn DocumentTextExtractor>) -> Self {
        Self { extractor }
    }

    /// Produces exactly one `AnalysisRequest` variant, or a local error.
    pub async fn normalize(&self, input: UserInput) -> Result<AnalysisRequest, IngestError> {
        match input {
            UserInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(IngestError::EmptyInput);
                }
                let chars = text.chars().count();
                if chars > MAX_TEXT_CHARS {
                    return Err(IngestError::TextTooLong { chars });
                }
                Ok(AnalysisRequest::Text { text })
            }
            UserInput::Url(url) => {
                if url.trim().is_empty() {
                    return Err(IngestError::EmptyInput);
                }
                Ok(AnalysisRequest::Url { url })
            }
            UserInput::File(file) => self.normalize_file(file).await,
        }
    }

    async fn normalize_file(&self, file: UploadedFile) -> Result<AnalysisRequest, IngestError> {
        if file.size > MAX_FILE_SIZE {
            return Err(IngestError::FileTooLarge { size: file.size });
        }

        let media_type = effective_media_type(&file);
        debug!(name = %file.name, %media_type, size = file.size, "Normalizing upload");

        match media_type.as_str() {
            DOCX_MEDIA_TYPE => {
                let text = self
                    .extractor
                    .extract_raw_text(file.bytes)
                    .await
                    .map_err(|e| {
                        warn!("Word extraction failed: {}", e);
                        IngestError::CorruptDocument
                    })?;
                if text.trim().is_empty() {
                    return Err(IngestError::EmptyDocument);
                }
                Ok(AnalysisRequest::Text { text })
            }
            PDF_MEDIA_TYPE => Ok(AnalysisRequest::File {
                data: BASE64.encode(&file.bytes),
                media_type: PDF_MEDIA_TYPE.to_string(),
            }),
            image if image.starts_with("image/") => Ok(AnalysisRequest::File {
                data: BASE64.encode(&file.bytes),
                media_type: media_type.clone(),
            }),
            TEXT_MEDIA_TYPE => {
                let text = String::from_utf8_lossy(&file.bytes).into_owned();
                if text.trim().is_empty() {
                    return Err(IngestError::EmptyTextFile);
                }
                Ok(AnalysisRequest::Text { text })
            }
            _ => Err(IngestError::UnsupportedFormat { media_type: media_type.clone() }),
        }
    }
}

/// The declared media type, or one inferred from an accepted extension when
/// the surface declared nothing useful.
fn effective_media_type(file: &UploadedFile) -> String {
    let declared = file.media_type.trim();
    if !declared.is_empty() && declared != "application/octet-stream" {
        return declared.to_string();
    }
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return declared.to_string();
    }
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => PDF_MEDIA_TYPE,
        "docx" => DOCX_MEDIA_TYPE,
        _ => TEXT_MEDIA_TYPE,
    }
    .to_string()
}
