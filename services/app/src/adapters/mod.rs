pub mod analysis_llm;
pub mod docx;
pub mod kv_store;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use docx::DocxTextExtractor;
pub use kv_store::SqliteKvAdapter;
