//! Minimal SpreadsheetML writer for the two statement sheets.
//!
//! Cells are written as inline strings so no shared-string table is needed.
//! Style index 1 is the bold font used for the transactions header.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::escape::escape;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::ExtractError;
use crate::model::{MetadataPair, RawCell, Statement};

pub const DETAILS_SHEET: &str = "Bank Details";
pub const TRANSACTIONS_SHEET: &str = "Bank Transactions";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const BOLD_STYLE: u8 = 1;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/><sheet name="{}" sheetId="2" r:id="rId2"/></sheets></workbook>"#,
        escape(DETAILS_SHEET),
        escape(TRANSACTIONS_SHEET),
    )
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
fn column_name(mut index: usize) -> String {
    const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut name = Vec::new();
    loop {
        name.push(char::from(LETTERS[index % 26]));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.iter().rev().collect()
}

/// Drops characters XML 1.0 cannot carry at all.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\t' | '\n' | '\r'))
        .collect()
}

struct SheetBuilder {
    xml: String,
    next_row: usize,
}

impl SheetBuilder {
    fn new() -> Self {
        Self {
            xml: String::from(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
            ),
            next_row: 1,
        }
    }

    fn push_row<'a>(&mut self, cells: impl IntoIterator<Item = Option<&'a str>>, style: Option<u8>) {
        let row_number = self.next_row;
        self.next_row += 1;

        self.xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (column, cell) in cells.into_iter().enumerate() {
            let Some(value) = cell else {
                continue;
            };
            let reference = format!("{}{row_number}", column_name(column));
            let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
            self.xml.push_str(&format!(
                r#"<c r="{reference}" t="inlineStr"{style_attr}><is><t xml:space="preserve">{}</t></is></c>"#,
                escape(xml_safe(value).as_str()),
            ));
        }
        self.xml.push_str("</row>");
    }

    fn finish(mut self) -> String {
        self.xml.push_str("</sheetData></worksheet>");
        self.xml
    }
}

fn cell_values(row: &[RawCell]) -> impl Iterator<Item = Option<&str>> {
    row.iter().map(Option::as_deref)
}

fn details_sheet(details: &[MetadataPair]) -> String {
    let mut sheet = SheetBuilder::new();
    for pair in details {
        sheet.push_row([Some(pair.key.as_str()), Some(pair.value.as_str())], None);
    }
    sheet.finish()
}

fn transactions_sheet(statement: &Statement) -> String {
    let table = &statement.transactions;
    let mut sheet = SheetBuilder::new();
    if !table.header.is_empty() {
        sheet.push_row(cell_values(&table.header), Some(BOLD_STYLE));
    }
    for row in &table.rows {
        sheet.push_row(cell_values(row), None);
    }
    sheet.finish()
}

/// Serializes the statement as an `.xlsx` workbook: details first, then transactions.
pub fn write_statement_xlsx(statement: &Statement) -> Result<Vec<u8>, ExtractError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/worksheets/sheet1.xml", details_sheet(&statement.details)),
        ("xl/worksheets/sheet2.xml", transactions_sheet(statement)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

pub(crate) fn write_statement_xlsx_file(
    path: &Path,
    statement: &Statement,
) -> Result<(), ExtractError> {
    std::fs::write(path, write_statement_xlsx(statement)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{column_name, details_sheet, transactions_sheet, xml_safe};
    use crate::model::{MergedTable, MetadataPair, Statement};

    #[test]
    fn names_columns_like_a_spreadsheet() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(xml_safe("a\u{0001}b\tc"), "ab\tc");
    }

    #[test]
    fn escapes_detail_text() {
        let xml = details_sheet(&[MetadataPair::new("Name", " A & B <Ltd>")]);
        assert!(xml.contains(r#"<c r="B1" t="inlineStr"><is><t xml:space="preserve"> A &amp; B &lt;Ltd&gt;</t></is></c>"#));
    }

    #[test]
    fn bolds_only_the_header_and_skips_absent_cells() {
        let statement = Statement {
            details: Vec::new(),
            transactions: MergedTable {
                header: vec![Some("Date".to_string()), Some("Debit".to_string())],
                rows: vec![vec![None, Some("10".to_string())]],
                table_count: 1,
            },
        };

        let xml = transactions_sheet(&statement);
        assert!(xml.contains(r#"<c r="A1" t="inlineStr" s="1">"#));
        assert!(xml.contains(r#"<c r="B2" t="inlineStr"><is>"#));
        assert!(!xml.contains(r#"r="A2""#));
    }
}
