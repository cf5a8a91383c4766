use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use encoding_rs::{BIG5, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::model::PageText;
use crate::table_parse::{soft_split_line_into_cells, split_line_into_cells};
use crate::warning::{ExtractWarning, WarningCode};

/// Every page of a loaded statement, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatementPages {
    pub pages: Vec<PageText>,
}

impl StatementPages {
    /// Text of document page 1, if the document has one and it yielded any text.
    pub fn first_page_text(&self) -> Option<&str> {
        self.pages
            .iter()
            .find(|page| page.page_number == 1)
            .map(|page| page.text.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSource {
    PdfExtract,
    ContentStream,
    Lopdf,
}

fn split_text_into_pages(raw_text: &str) -> Vec<&str> {
    let mut pages = raw_text.split('\u{000C}').collect::<Vec<_>>();
    if pages.last().is_some_and(|page| page.is_empty()) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let utf16_body = bytes
        .strip_prefix(&[0xFE, 0xFF])
        .or_else(|| bytes.strip_prefix(&[0xFF, 0xFE]));
    let hinted = encoding.map(str::to_ascii_lowercase).unwrap_or_default();
    let hinted_utf16 = ["utf16", "ucs2", "identity-h", "unicode"]
        .iter()
        .any(|hint| hinted.contains(hint));

    if let Some(body) = utf16_body.or(hinted_utf16.then_some(bytes)) {
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(body);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if ["big5", "b5", "eten", "cns"]
        .iter()
        .any(|hint| hinted.contains(hint))
    {
        let (big5, _, had_errors) = BIG5.decode(bytes);
        if !had_errors && !big5.is_empty() {
            return big5.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Higher is better: rewards lines that split into cells and lines that carry dates.
fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut score = 0_i64;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        score += 1;
        if split_line_into_cells(line).len() >= 2 || soft_split_line_into_cells(line).len() >= 3 {
            score += 50;
        }
        if line.contains('/') && line.chars().any(|ch| ch.is_ascii_digit()) {
            score += 15;
        }
    }

    if looks_decoding_broken(text) {
        score -= 800;
    }
    score
}

fn extract_text_from_page_content(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                // Large negative kerning in a TJ array is a visual gap.
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" if !current.trim().is_empty() => {
                lines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// `pdf-extract` over the whole document. It can panic on fonts `lopdf` accepts,
/// so a panic counts as no text from this source.
fn whole_document_text(input_pdf: &[u8]) -> Option<String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(input_pdf)
    }));
    match result {
        Ok(Ok(text)) => Some(text),
        Ok(Err(error)) => {
            debug!(%error, "pdf-extract could not read the document");
            None
        }
        Err(_) => {
            debug!("pdf-extract panicked; using the other text sources");
            None
        }
    }
}

/// Loads every page's text. Only a document that cannot be opened is an error;
/// a page with no recoverable text is returned empty with a warning.
pub(crate) fn read_statement_pages(
    input_pdf: &[u8],
    warnings: &mut Vec<ExtractWarning>,
) -> Result<StatementPages, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    let pages_map = document.get_pages();

    let whole_text = whole_document_text(input_pdf);
    let split_pages = whole_text
        .as_deref()
        .map(split_text_into_pages)
        .filter(|pages| pages.len() == pages_map.len());

    let mut pages = Vec::with_capacity(pages_map.len());
    for (index, (page_no, page_id)) in pages_map.iter().enumerate() {
        let mut candidates: Vec<(TextSource, String)> = Vec::new();
        if let Some(text) = split_pages
            .as_ref()
            .and_then(|split| split.get(index))
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push((TextSource::PdfExtract, (*text).to_string()));
        }
        if let Some(text) = extract_text_from_page_content(&document, *page_id) {
            candidates.push((TextSource::ContentStream, text));
        }
        if let Some(text) = document
            .extract_text(&[*page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push((TextSource::Lopdf, text));
        }

        let best = candidates
            .into_iter()
            .max_by_key(|(_, text)| extraction_quality_score(text));
        let text = match best {
            Some((source, text)) => {
                debug!(page = page_no, ?source, "selected page text");
                text
            }
            None => {
                warn!(page = page_no, "no extractable text on page");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::PageTextUnavailable,
                        "page has no extractable text; it contributes no tables",
                    )
                    .with_page(*page_no),
                );
                String::new()
            }
        };

        pages.push(PageText {
            page_number: *page_no,
            text,
        });
    }

    Ok(StatementPages { pages })
}

#[cfg(test)]
mod tests {
    use super::{
        StatementPages, decode_pdf_bytes, extraction_quality_score, read_statement_pages,
        split_text_into_pages, whole_document_text,
    };
    use crate::model::PageText;

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn decodes_big5_when_encoding_hint_is_present() {
        let (bytes, _, had_errors) = encoding_rs::BIG5.encode("測試");
        assert!(!had_errors);
        let decoded = decode_pdf_bytes(Some("ETen-B5-H"), &bytes);
        assert_eq!(decoded, "測試");
    }

    #[test]
    fn columnar_text_scores_above_prose() {
        let columns = "Date  Debit  Credit\n01/04/2024  10  0";
        let prose = "Dear customer\nthank you";
        assert!(extraction_quality_score(columns) > extraction_quality_score(prose));
    }

    #[test]
    fn first_page_text_ignores_blank_text() {
        let pages = StatementPages {
            pages: vec![PageText {
                page_number: 1,
                text: "  \n".to_string(),
            }],
        };
        assert_eq!(pages.first_page_text(), None);
    }

    #[test]
    fn unreadable_content_yields_no_whole_document_text() {
        assert_eq!(whole_document_text(b"%PDF-1.4 not really a document"), None);
    }

    #[test]
    fn garbage_bytes_are_a_load_error() {
        let mut warnings = Vec::new();
        let err = read_statement_pages(b"definitely not a pdf", &mut warnings)
            .expect_err("garbage should not load");
        assert!(err.is_malformed_document());
    }
}
