use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("table detection failed on page {page}: {reason}")]
    Detection { page: u32, reason: String },

    #[error("no tables found in the PDF")]
    NoTables,

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}

impl ExtractError {
    /// True when the document opened but nothing tabular was found in it.
    #[must_use]
    pub fn is_no_tables(&self) -> bool {
        matches!(self, Self::NoTables)
    }

    /// True when the document itself could not be parsed.
    #[must_use]
    pub fn is_malformed_document(&self) -> bool {
        matches!(self, Self::PdfLoad(_))
    }
}
