use std::collections::HashMap;

use crate::model::RawRow;

/// Splits a laid-out text line into cells at tabs and at gaps of two or more spaces.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    fn flush(current: &mut String, cells: &mut Vec<String>) {
        let cell = current.trim();
        if !cell.is_empty() {
            cells.push(cell.to_string());
        }
        current.clear();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut pending_space = 0_usize;

    for ch in line.trim().chars() {
        if ch == '\t' {
            flush(&mut current, &mut cells);
            pending_space = 0;
        } else if ch.is_whitespace() {
            pending_space += 1;
        } else {
            if pending_space >= 2 {
                flush(&mut current, &mut cells);
            } else if pending_space == 1 {
                current.push(' ');
            }
            pending_space = 0;
            current.push(ch);
        }
    }
    flush(&mut current, &mut cells);

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn into_raw_row(cells: Vec<String>) -> RawRow {
    cells.into_iter().map(Some).collect()
}

/// Most common row width; ties go to the wider one.
pub(crate) fn modal_width(rows: &[RawRow]) -> usize {
    let mut freq = HashMap::new();
    for width in rows.iter().map(Vec::len) {
        *freq.entry(width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .max_by_key(|(width, count)| (*count, *width))
        .map_or(0, |(width, _)| width)
}

#[cfg(test)]
mod tests {
    use super::{into_raw_row, modal_width, soft_split_line_into_cells, split_line_into_cells};

    #[test]
    fn splits_on_wide_gaps_and_keeps_single_spaces() {
        let cells = split_line_into_cells("01/04/2024   UPI Transfer to Shop   250.00    9,750.00");
        assert_eq!(cells, vec!["01/04/2024", "UPI Transfer to Shop", "250.00", "9,750.00"]);
    }

    #[test]
    fn splits_tab_separated_cells() {
        let cells = split_line_into_cells("Date\tDebit\tCredit");
        assert_eq!(cells, vec!["Date", "Debit", "Credit"]);
    }

    #[test]
    fn blank_line_has_no_cells() {
        assert!(split_line_into_cells("   \t  ").is_empty());
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("Date Debit Credit");
        assert_eq!(cells, vec!["Date", "Debit", "Credit"]);
    }

    #[test]
    fn detects_modal_width() {
        let rows = vec![
            into_raw_row(vec!["a".to_string(), "b".to_string()]),
            into_raw_row(vec!["1".to_string(), "2".to_string()]),
            into_raw_row(vec!["x".to_string()]),
        ];
        assert_eq!(modal_width(&rows), 2);
    }
}
