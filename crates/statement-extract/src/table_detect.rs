use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::model::{PageText, RawRow, RawTable};
use crate::options::ExtractOptions;
use crate::table_parse::{
    into_raw_row, modal_width, soft_split_line_into_cells, split_line_into_cells,
};
use crate::warning::{ExtractWarning, WarningCode};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Finds tables on a single page.
///
/// Implementations return tables in the order they appear on the page. Each
/// table is a list of rows; cells may be absent and rows may differ in width.
pub trait TableDetector: Send + Sync {
    fn detect_tables(&self, page: &PageText) -> Result<Vec<RawTable>, ExtractError>;

    /// Name of this detection backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Detects tables from column gaps in extracted page text.
///
/// Consecutive lines that split into at least `min_cols` cells form a table;
/// a run shorter than two lines is discarded. A run ends at a blank line, a
/// sentence, or a `Key: value` line on `key_value_separator`. Any other short
/// line inside a run is a wrapped cell and is folded into the row above.
#[derive(Debug, Clone)]
pub struct TextLayoutDetector {
    pub min_cols: usize,
    pub key_value_separator: Option<char>,
}

impl Default for TextLayoutDetector {
    fn default() -> Self {
        Self {
            min_cols: 2,
            key_value_separator: Some(':'),
        }
    }
}

impl TextLayoutDetector {
    /// Detector tuned to the column minimum and metadata separator of a run.
    #[must_use]
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self {
            min_cols: options.min_cols,
            key_value_separator: Some(options.metadata_separator),
        }
    }

    fn is_key_value_line(&self, line: &str) -> bool {
        let Some(separator) = self.key_value_separator else {
            return false;
        };
        let Some((key, _)) = line.split_once(separator) else {
            return false;
        };
        let key = key.trim();
        !key.is_empty()
            && !key.chars().any(|ch| ch.is_ascii_digit())
            && split_line_into_cells(key).len() == 1
    }

    /// Cells for `line`. The single-space split is used only for lines that
    /// carry numbers or that line up with the open run's width.
    fn row_cells(&self, line: &str, run_width: Option<usize>) -> Vec<String> {
        let cells = split_line_into_cells(line);
        if cells.len() >= self.min_cols {
            return cells;
        }

        let soft_cells = soft_split_line_into_cells(line);
        let has_numeric = soft_cells
            .iter()
            .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
        if soft_cells.len() >= self.min_cols
            && !looks_like_sentence(line)
            && (has_numeric || run_width == Some(soft_cells.len()))
        {
            soft_cells
        } else {
            cells
        }
    }
}

fn looks_like_sentence(line: &str) -> bool {
    ['.', '!', '?']
        .iter()
        .any(|punctuation| line.trim_end().ends_with(*punctuation))
}

/// Appends a wrapped line to the row above it, in its first cell without digits.
fn append_continuation(row: &mut RawRow, text: &str) {
    let target = row
        .iter()
        .position(|cell| {
            cell.as_deref()
                .is_some_and(|value| !value.chars().any(|ch| ch.is_ascii_digit()))
        })
        .or_else(|| row.len().checked_sub(1));
    let Some(index) = target else {
        return;
    };
    match &mut row[index] {
        Some(cell) => {
            cell.push(' ');
            cell.push_str(text);
        }
        empty => *empty = Some(text.to_string()),
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "row counts and widths stay far below f32's exact integer range"
)]
fn table_confidence(rows: &[RawRow]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let max_width = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let min_width = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = 1.0 - ((max_width - min_width) as f32 / max_width as f32);

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

impl TableDetector for TextLayoutDetector {
    fn detect_tables(&self, page: &PageText) -> Result<Vec<RawTable>, ExtractError> {
        let mut tables = Vec::new();
        let mut current: Vec<RawRow> = Vec::new();

        let mut close_run = |rows: &mut Vec<RawRow>| {
            if rows.len() >= 2 {
                let confidence = table_confidence(rows);
                tables.push(RawTable {
                    page: page.page_number,
                    rows: std::mem::take(rows),
                    confidence,
                });
            } else {
                rows.clear();
            }
        };

        for line in page.text.lines() {
            if line.trim().is_empty() || self.is_key_value_line(line) {
                close_run(&mut current);
                continue;
            }

            let cells = self.row_cells(line, current.last().map(Vec::len));
            if cells.len() >= self.min_cols {
                current.push(into_raw_row(cells));
            } else if looks_like_sentence(line) {
                close_run(&mut current);
            } else if let Some(previous) = current.last_mut() {
                append_continuation(previous, line.trim());
            }
        }
        close_run(&mut current);

        Ok(tables)
    }

    fn backend_name(&self) -> &str {
        "text-layout"
    }
}

#[cfg(feature = "parallel")]
fn run_detector(
    pages: &[PageText],
    detector: &dyn TableDetector,
) -> Vec<(u32, Result<Vec<RawTable>, ExtractError>)> {
    use rayon::prelude::*;

    // Indexed collect keeps page order.
    pages
        .par_iter()
        .map(|page| (page.page_number, detector.detect_tables(page)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_detector(
    pages: &[PageText],
    detector: &dyn TableDetector,
) -> Vec<(u32, Result<Vec<RawTable>, ExtractError>)> {
    pages
        .iter()
        .map(|page| (page.page_number, detector.detect_tables(page)))
        .collect()
}

/// Runs `detector` over every page and concatenates tables in page order.
///
/// A page whose detection fails contributes nothing and leaves a warning.
pub(crate) fn detect_page_tables(
    pages: &[PageText],
    detector: &dyn TableDetector,
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<RawTable> {
    let mut tables = Vec::new();
    for (page_number, result) in run_detector(pages, detector) {
        match result {
            Ok(page_tables) => {
                debug!(
                    page = page_number,
                    tables = page_tables.len(),
                    backend = detector.backend_name(),
                    "detected tables"
                );
                tables.extend(page_tables);
            }
            Err(error) => {
                warn!(page = page_number, %error, "table detection failed; skipping page");
                warnings.push(
                    ExtractWarning::new(WarningCode::TableDetectionFailed, error.to_string())
                        .with_page(page_number),
                );
            }
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{TableDetector, TextLayoutDetector, detect_page_tables};
    use crate::error::ExtractError;
    use crate::model::{PageText, RawTable};
    use crate::warning::WarningCode;

    fn page(page_number: u32, lines: &[&str]) -> PageText {
        PageText {
            page_number,
            text: lines.join("\n"),
        }
    }

    #[test]
    fn groups_consecutive_columnar_lines() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(
                1,
                &[
                    "Date        Particulars        Debit     Credit    Balance",
                    "01/04/2024  Opening balance                        10,000.00",
                    "02/04/2024  ATM withdrawal     500.00              9,500.00",
                    "",
                    "This statement is computer generated.",
                ],
            ))
            .expect("detection should succeed");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[0][0].as_deref(), Some("Date"));
        assert_eq!(tables[0].rows[1].len(), 3);
    }

    #[test]
    fn key_value_lines_split_tables() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(
                1,
                &[
                    "Account No: 12345",
                    "IFSC Code: ABCD0001234",
                    "Date  Debit  Credit",
                    "01/04  10  0",
                    "Branch: Main Road",
                    "Date  Debit  Credit",
                    "02/04  0  20",
                ],
            ))
            .expect("detection should succeed");

        assert_eq!(tables.len(), 2);
        assert!(tables.iter().all(|table| table.rows.len() == 2));
    }

    #[test]
    fn wrapped_narration_stays_in_one_table() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(
                1,
                &[
                    "Date        Particulars        Debit     Balance",
                    "01/04/2024  Card purchase      100.00    900.00",
                    "            groceries",
                    "02/04/2024  Salary                       2,900.00",
                    "03/04/2024  Rent               800.00    2,100.00",
                ],
            ))
            .expect("detection should succeed");

        assert_eq!(tables.len(), 1);
        let rows = &tables[0].rows;
        assert_eq!(
            rows.iter()
                .map(|row| row[0].clone().unwrap_or_default())
                .collect::<Vec<_>>(),
            vec!["Date", "01/04/2024", "02/04/2024", "03/04/2024"]
        );
        assert_eq!(rows[1][1].as_deref(), Some("Card purchase groceries"));
    }

    #[test]
    fn letterhead_prose_is_not_a_table() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(
                1,
                &[
                    "Statement of Account",
                    "Prepared for Jane Doe",
                    "Thank you for banking with us.",
                ],
            ))
            .expect("detection should succeed");
        assert!(tables.is_empty());
    }

    #[test]
    fn single_spaced_rows_join_a_run_of_the_same_width() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(1, &["Date  Narration  Status", "Monday Fee Pending"]))
            .expect("detection should succeed");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[1].len(), 3);
    }

    #[test]
    fn single_lines_and_prose_are_not_tables() {
        let detector = TextLayoutDetector::default();
        let tables = detector
            .detect_tables(&page(1, &["Statement of account.", "Thank you for banking with us."]))
            .expect("detection should succeed");
        assert!(tables.is_empty());
    }

    struct FailingOnPage(u32);

    impl TableDetector for FailingOnPage {
        fn detect_tables(&self, page: &PageText) -> Result<Vec<RawTable>, ExtractError> {
            if page.page_number == self.0 {
                return Err(ExtractError::Detection {
                    page: page.page_number,
                    reason: "corrupt content stream".to_string(),
                });
            }
            Ok(vec![RawTable::new(page.page_number, vec![vec![None]])])
        }

        fn backend_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn failed_pages_are_skipped_with_a_warning() {
        let pages = (1..=4).map(|number| page(number, &[])).collect::<Vec<_>>();
        let mut warnings = Vec::new();

        let tables = detect_page_tables(&pages, &FailingOnPage(2), &mut warnings);

        assert_eq!(
            tables.iter().map(|table| table.page).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::TableDetectionFailed);
        assert_eq!(warnings[0].page, Some(2));
    }

    #[test]
    fn tables_keep_page_order_across_many_pages() {
        let pages = (1..=64)
            .map(|number| {
                let row = format!("{number}  x");
                page(number, &["A  B", row.as_str()])
            })
            .collect::<Vec<_>>();
        let mut warnings = Vec::new();

        let tables = detect_page_tables(&pages, &TextLayoutDetector::default(), &mut warnings);

        assert!(warnings.is_empty());
        assert_eq!(
            tables.iter().map(|table| table.page).collect::<Vec<_>>(),
            (1..=64).collect::<Vec<_>>()
        );
    }
}
