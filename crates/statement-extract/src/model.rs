/// A single extracted cell. `None` marks a cell the detector saw but could not fill.
pub type RawCell = Option<String>;

/// Cells of one row, in column order. Width may differ between rows of one table.
pub type RawRow = Vec<RawCell>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub page: u32,
    pub rows: Vec<RawRow>,
    pub confidence: f32,
}

impl RawTable {
    #[must_use]
    pub fn new(page: u32, rows: Vec<RawRow>) -> Self {
        Self {
            page,
            rows,
            confidence: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
}

impl MetadataPair {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One header row followed by every data row, in page, table, row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTable {
    pub header: RawRow,
    pub rows: Vec<RawRow>,
    pub table_count: usize,
}

impl MergedTable {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub details: Vec<MetadataPair>,
    pub transactions: MergedTable,
}
