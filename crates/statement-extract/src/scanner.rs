use crate::model::MetadataPair;

/// Splits page text into key/value pairs at the first `separator` of each line.
///
/// Lines without the separator are skipped. Keys and values are kept exactly as
/// split, surrounding whitespace included, and duplicates are preserved in order.
#[must_use]
pub fn scan_metadata(text: Option<&str>, separator: char) -> Vec<MetadataPair> {
    let Some(text) = text else {
        return Vec::new();
    };

    text.lines()
        .filter_map(|line| line.split_once(separator))
        .map(|(key, value)| MetadataPair::new(key, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::scan_metadata;
    use crate::model::MetadataPair;

    #[test]
    fn keeps_separator_lines_and_drops_the_rest() {
        let pairs = scan_metadata(
            Some("Account No: 12345\nIFSC: ABCD0001234\nSome stray line"),
            ':',
        );
        assert_eq!(
            pairs,
            vec![
                MetadataPair::new("Account No", " 12345"),
                MetadataPair::new("IFSC", " ABCD0001234"),
            ]
        );
    }

    #[test]
    fn splits_only_at_first_separator() {
        let pairs = scan_metadata(Some("Generated: 01/02/2024 10:30:00"), ':');
        assert_eq!(pairs, vec![MetadataPair::new("Generated", " 01/02/2024 10:30:00")]);
    }

    #[test]
    fn preserves_duplicate_keys_in_order() {
        let pairs = scan_metadata(Some("Branch: A\r\nBranch: B\n"), ':');
        assert_eq!(
            pairs,
            vec![MetadataPair::new("Branch", " A"), MetadataPair::new("Branch", " B")]
        );
    }

    #[test]
    fn empty_or_missing_text_yields_nothing() {
        assert!(scan_metadata(None, ':').is_empty());
        assert!(scan_metadata(Some(""), ':').is_empty());
    }

    #[test]
    fn honours_custom_separator() {
        let pairs = scan_metadata(Some("Name = Jane: Doe"), '=');
        assert_eq!(pairs, vec![MetadataPair::new("Name ", " Jane: Doe")]);
    }
}
