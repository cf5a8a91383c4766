use tracing::debug;

use crate::error::ExtractError;
use crate::model::{MergedTable, RawTable};
use crate::normalize::normalize_header;
use crate::options::CanonicalSchema;

/// Folds page tables into one table with a single normalized header.
///
/// The first row of the first non-empty table becomes the header. The first
/// row of every later table is taken to be a repeated header and dropped.
/// Remaining rows are appended verbatim, ragged widths included.
pub fn merge_tables(
    tables: &[RawTable],
    schema: &CanonicalSchema,
) -> Result<MergedTable, ExtractError> {
    if tables.is_empty() {
        return Err(ExtractError::NoTables);
    }

    let mut header = None;
    let mut rows = Vec::new();
    for (index, table) in tables.iter().enumerate() {
        let mut table_rows = table.rows.iter();
        let Some(first) = table_rows.next() else {
            continue;
        };

        if header.is_none() {
            header = Some(normalize_header(first, schema));
        } else {
            debug!(
                page = table.page,
                table_id = index + 1,
                "dropping repeated header row"
            );
        }
        rows.extend(table_rows.cloned());
    }

    Ok(MergedTable {
        header: header.unwrap_or_default(),
        rows,
        table_count: tables.len(),
    })
}
