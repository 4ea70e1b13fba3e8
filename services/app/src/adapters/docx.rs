//! services/app/src/adapters/docx.rs
//!
//! This module contains the word-processing text extractor.
//! It implements the `DocumentTextExtractor` port from the `core` crate by
//! reading `word/document.xml` out of the `.docx` archive and keeping only the
//! run text, one line per paragraph.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use juriscan_core::ports::{DocumentTextExtractor, PortError, PortResult};
use regex::Regex;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br/>|<w:cr/>|</w:p>|<w:p(?:\s[^>]*)?/>")
        .expect("static pattern")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("static pattern")
});

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Extracts the raw text of `.docx` documents.
#[derive(Clone, Default)]
pub struct DocxTextExtractor;

impl DocxTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract(document: &[u8]) -> PortResult<String> {
        let mut archive = ZipArchive::new(Cursor::new(document))
            .map_err(|e| PortError::Unexpected(format!("Not a Word archive: {}", e)))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| PortError::Unexpected(format!("Missing {}: {}", DOCUMENT_PART, e)))?
            .read_to_string(&mut xml)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(text_from_document_xml(&xml))
    }
}

/// Concatenates the text runs of a WordprocessingML body.
fn text_from_document_xml(xml: &str) -> String {
    let mut text = String::new();
    for token in TOKEN.captures_iter(xml) {
        match token.get(1) {
            Some(run) => text.push_str(&unescape(run.as_str())),
            None => match &token[0] {
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text
}

/// Decodes the predefined XML entities and numeric character references in one
/// pass, so `&amp;lt;` stays `&lt;`. Unknown or invalid references are kept as-is.
fn unescape(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => name
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| name[1..].parse::<u32>())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

//=========================================================================================
// `DocumentTextExtractor` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentTextExtractor for DocxTextExtractor {
    async fn extract_raw_text(&self, document: Bytes) -> PortResult<String> {
        tokio::task::spawn_blocking(move || Self::extract(&document))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn docx(document_xml: &str) -> Bytes {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        Bytes::from(writer.finish().unwrap().into_inner())
    }

    #[tokio::test]
    async fn extracts_paragraph_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Art. 7. Rezilierea.</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Taxa de </w:t></w:r><w:r><w:t>24 luni &amp; penalități</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = DocxTextExtractor::new().extract_raw_text(docx(xml)).await.unwrap();
        assert_eq!(text, "Art. 7. Rezilierea.\nTaxa de 24 luni & penalități\n");
    }

    #[tokio::test]
    async fn empty_body_yields_blank_text() {
        let text = DocxTextExtractor::new()
            .extract_raw_text(docx("<w:document><w:body><w:p/></w:body></w:document>"))
            .await
            .unwrap();
        assert!(text.trim().is_empty());
    }

    #[tokio::test]
    async fn non_archive_is_an_error() {
        let result = DocxTextExtractor::new()
            .extract_raw_text(Bytes::from_static(b"definitely not a zip"))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn character_references_are_decoded() {
        let xml = "<w:p><w:r><w:t>Penalit&#259;&#539;i &#x219;i &amp;lt;dob&#226;nzi&gt;</w:t></w:r></w:p>";
        assert_eq!(text_from_document_xml(xml), "Penalități și &lt;dobânzi>\n");
    }

    #[test]
    fn invalid_references_are_kept() {
        assert_eq!(unescape("&#xD800; &#99999999999;"), "&#xD800; &#99999999999;");
    }

    #[test]
    fn empty_paragraphs_break_lines() {
        let xml = r#"<w:p><w:r><w:t>Art. 1</w:t></w:r></w:p><w:p/><w:p w:rsidR="00A1"/><w:p><w:r><w:t>Art. 2</w:t></w:r></w:p>"#;
        assert_eq!(text_from_document_xml(xml), "Art. 1\n\n\nArt. 2\n");
    }

    #[test]
    fn tabs_and_breaks_are_kept() {
        let xml = "<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t><w:br/><w:t>C</w:t></w:r></w:p>";
        assert_eq!(text_from_document_xml(xml), "A\tB\nC\n");
    }
}
