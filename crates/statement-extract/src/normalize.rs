use crate::model::{RawCell, RawRow};
use crate::options::CanonicalSchema;

/// First schema column, in schema order, whose name or alternative occurs in
/// `cell` ignoring case. An absent cell is matched as the empty string.
#[must_use]
pub fn match_column<'a>(cell: Option<&str>, schema: &'a CanonicalSchema) -> Option<&'a str> {
    let haystack = cell.unwrap_or_default().to_lowercase();
    schema
        .columns()
        .iter()
        .enumerate()
        .find(|(index, _)| {
            schema
                .needles(*index)
                .iter()
                .any(|needle| haystack.contains(needle.as_str()))
        })
        .map(|(_, column)| column.as_str())
}

/// Replaces every cell that matches a schema column with that column's name.
/// Unmatched cells, absent ones included, pass through untouched.
#[must_use]
pub fn normalize_header(row: &[RawCell], schema: &CanonicalSchema) -> RawRow {
    row.iter()
        .map(|cell| match match_column(cell.as_deref(), schema) {
            Some(column) => Some(column.to_string()),
            None => cell.clone(),
        })
        .collect()
}
