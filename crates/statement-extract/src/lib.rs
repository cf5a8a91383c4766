//! Bank statement PDF to normalized tables.
//!
//! The pipeline reads every page of a text PDF, pulls `Key: value` details off
//! page 1, detects tables on each page, aligns the first header row with a
//! canonical column schema, and folds all tables into one transactions table.

mod csv_out;
mod error;
mod merge;
mod model;
mod normalize;
mod options;
mod pdf_reader;
mod scanner;
mod table_detect;
mod table_parse;
mod warning;
mod xlsx_out;

use std::path::Path;

use tracing::{info, warn};

use crate::csv_out::{write_details_csv_file, write_transactions_csv_file};
use crate::pdf_reader::{StatementPages, read_statement_pages};
use crate::table_detect::{LOW_CONFIDENCE_THRESHOLD, detect_page_tables};
use crate::xlsx_out::write_statement_xlsx_file;

pub use error::ExtractError;
pub use merge::merge_tables;
pub use model::{MergedTable, MetadataPair, PageText, RawCell, RawRow, RawTable, Statement};
pub use normalize::{match_column, normalize_header};
pub use options::{
    CanonicalSchema, DEFAULT_COLUMNS, DEFAULT_METADATA_SEPARATOR, ExtractOptions, PageSelection,
};
pub use scanner::scan_metadata;
pub use table_detect::{TableDetector, TextLayoutDetector};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};
pub use xlsx_out::{DETAILS_SHEET, TRANSACTIONS_SHEET, write_statement_xlsx};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub page_count: usize,
    pub table_count: usize,
    pub row_count: usize,
    pub detail_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

fn flag_low_confidence(tables: &[RawTable], warnings: &mut Vec<ExtractWarning>) {
    for (index, table) in tables.iter().enumerate() {
        if table.confidence < LOW_CONFIDENCE_THRESHOLD {
            warnings.push(
                ExtractWarning::new(
                    ExtractWarningCode::LowConfidence,
                    "table columns are irregular; rows are kept as detected",
                )
                .with_page(table.page)
                .with_table_id(index + 1)
                .with_confidence(table.confidence),
            );
        }
    }
}

fn extract_from_pages(
    pages: &StatementPages,
    options: &ExtractOptions,
    detector: &dyn TableDetector,
    mut warnings: Vec<ExtractWarning>,
) -> Result<(Statement, ExtractionReport), ExtractError> {
    let details = scan_metadata(pages.first_page_text(), options.metadata_separator);

    let selected = pages
        .pages
        .iter()
        .filter(|page| {
            options
                .pages
                .as_ref()
                .is_none_or(|selection| selection.contains(page.page_number))
        })
        .cloned()
        .collect::<Vec<PageText>>();
    if selected.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    let tables = detect_page_tables(&selected, detector, &mut warnings);
    if tables.is_empty() {
        warn!(pages = selected.len(), "no tables detected in the selected pages");
    }
    flag_low_confidence(&tables, &mut warnings);

    let transactions = merge_tables(&tables, &options.schema)?;
    info!(
        tables = transactions.table_count,
        rows = transactions.row_count(),
        details = details.len(),
        "statement extracted"
    );

    let report = ExtractionReport {
        page_count: pages.pages.len(),
        table_count: transactions.table_count,
        row_count: transactions.row_count(),
        detail_count: details.len(),
        warnings,
    };
    Ok((
        Statement {
            details,
            transactions,
        },
        report,
    ))
}

/// Runs the pipeline with a caller-supplied table detector.
pub fn extract_statement_with_detector(
    input_pdf: &[u8],
    options: &ExtractOptions,
    detector: &dyn TableDetector,
) -> Result<(Statement, ExtractionReport), ExtractError> {
    options.validate()?;
    let mut warnings = Vec::new();
    let pages = read_statement_pages(input_pdf, &mut warnings)?;
    extract_from_pages(&pages, options, detector, warnings)
}

pub fn extract_statement_from_bytes(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(Statement, ExtractionReport), ExtractError> {
    let detector = TextLayoutDetector::from_options(options);
    extract_statement_with_detector(input_pdf, options, &detector)
}

pub fn extract_statement(
    input_pdf: &Path,
    options: &ExtractOptions,
) -> Result<(Statement, ExtractionReport), ExtractError> {
    let bytes = std::fs::read(input_pdf)?;
    extract_statement_from_bytes(&bytes, options)
}

pub fn convert_pdf_bytes_to_xlsx(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(Vec<u8>, ExtractionReport), ExtractError> {
    let (statement, report) = extract_statement_from_bytes(input_pdf, options)?;
    Ok((write_statement_xlsx(&statement)?, report))
}

pub fn convert_pdf_to_xlsx(
    input_pdf: &Path,
    output_xlsx: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (statement, report) = extract_statement(input_pdf, options)?;
    write_statement_xlsx_file(output_xlsx, &statement)?;
    Ok(report)
}

/// Writes transactions to `output_csv` and, when given, details to `details_csv`.
pub fn convert_pdf_to_csv(
    input_pdf: &Path,
    output_csv: &Path,
    details_csv: Option<&Path>,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (statement, report) = extract_statement(input_pdf, options)?;
    write_transactions_csv_file(output_csv, &statement.transactions, options.delimiter)?;
    if let Some(path) = details_csv {
        write_details_csv_file(path, &statement.details, options.delimiter)?;
    }
    Ok(report)
}
