use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ExtractError;

pub const DEFAULT_COLUMNS: [&str; 6] = [
    "Date",
    "Particulars / Description",
    "Cheque / Ref",
    "Debit",
    "Credit",
    "Balance / Closing balance",
];

pub const DEFAULT_METADATA_SEPARATOR: char = ':';

/// 1-based pages allowed to contribute tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn parse_page_number(token: &str, what: &str) -> Result<u32, String> {
    let page: u32 = token
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what}: '{token}'"))?;
    if page == 0 {
        return Err("pages are 1-based".to_string());
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(start, "page range start")?;
                    let end = parse_page_number(end, "page range end")?;
                    if end < start {
                        return Err(format!(
                            "invalid range '{token}': end is smaller than start"
                        ));
                    }
                    pages.extend(start..=end);
                }
                None => {
                    pages.insert(parse_page_number(token, "page number")?);
                }
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// Each non-empty lowercase `/` alternative, preceded by the whole name when it has several.
fn column_needles(column: &str) -> Vec<String> {
    let lowered = column.trim().to_lowercase();
    let alternatives = lowered
        .split('/')
        .map(str::trim)
        .filter(|alternative| !alternative.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if alternatives.len() < 2 {
        return alternatives;
    }

    let mut needles = Vec::with_capacity(alternatives.len() + 1);
    needles.push(lowered);
    needles.extend(alternatives);
    needles
}

/// Ordered list of column names a statement header is aligned to.
///
/// A name may carry alternative spellings separated by `/`, e.g.
/// `"Balance / Closing balance"`. Order matters: when a header cell matches
/// more than one name, the earliest one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    columns: Vec<String>,
    needles: Vec<Vec<String>>,
}

impl CanonicalSchema {
    /// Builds a schema, rejecting empty lists and names with nothing to match on.
    pub fn new<I, S>(columns: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect::<Vec<String>>();
        if columns.is_empty() {
            return Err(ExtractError::InvalidOption(
                "canonical schema needs at least one column".to_string(),
            ));
        }

        let mut needles = Vec::with_capacity(columns.len());
        for column in &columns {
            let column_needles = column_needles(column);
            if column_needles.is_empty() {
                return Err(ExtractError::InvalidOption(format!(
                    "canonical column '{column}' has nothing to match on"
                )));
            }
            needles.push(column_needles);
        }

        Ok(Self { columns, needles })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Lowercase strings any of which, found inside a cell, selects column `index`.
    pub(crate) fn needles(&self, index: usize) -> &[String] {
        self.needles.get(index).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for CanonicalSchema {
    fn default() -> Self {
        let columns = DEFAULT_COLUMNS.map(str::to_string).to_vec();
        let needles = columns.iter().map(|column| column_needles(column)).collect();
        Self { columns, needles }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub schema: CanonicalSchema,
    pub metadata_separator: char,
    pub min_cols: usize,
    pub delimiter: u8,
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min_cols < 2 {
            return Err(ExtractError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        if self.pages.as_ref().is_some_and(PageSelection::is_empty) {
            return Err(ExtractError::InvalidPageSelection(
                "page selection cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            schema: CanonicalSchema::default(),
            metadata_separator: DEFAULT_METADATA_SEPARATOR,
            min_cols: 2,
            delimiter: b',',
        }
    }
}
