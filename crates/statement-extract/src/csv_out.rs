use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ExtractError;
use crate::model::{MergedTable, MetadataPair, RawRow};

fn record(row: &RawRow) -> impl Iterator<Item = &str> {
    row.iter().map(|cell| cell.as_deref().unwrap_or_default())
}

/// Header then data rows. Record lengths follow each row; nothing is padded.
pub(crate) fn write_transactions_csv<W: Write>(
    out: W,
    table: &MergedTable,
    delimiter: u8,
) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(out);
    if !table.header.is_empty() {
        writer.write_record(record(&table.header))?;
    }
    for row in &table.rows {
        writer.write_record(record(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_details_csv<W: Write>(
    out: W,
    details: &[MetadataPair],
    delimiter: u8,
) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(out);
    for pair in details {
        writer.write_record([pair.key.as_str(), pair.value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_transactions_csv_file(
    path: &Path,
    table: &MergedTable,
    delimiter: u8,
) -> Result<(), ExtractError> {
    write_transactions_csv(std::fs::File::create(path)?, table, delimiter)
}

pub(crate) fn write_details_csv_file(
    path: &Path,
    details: &[MetadataPair],
    delimiter: u8,
) -> Result<(), ExtractError> {
    write_details_csv(std::fs::File::create(path)?, details, delimiter)
}

#[cfg(test)]
mod tests {
    use super::{write_details_csv, write_transactions_csv};
    use crate::model::{MergedTable, MetadataPair};

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|value| Some((*value).to_string())).collect()
    }

    #[test]
    fn writes_ragged_rows_without_padding() {
        let table = MergedTable {
            header: cells(&["Date", "Debit", "Credit"]),
            rows: vec![cells(&["01/04", "10"]), vec![Some("02/04".to_string()), None, Some("5".to_string())]],
            table_count: 1,
        };

        let mut out = Vec::new();
        write_transactions_csv(&mut out, &table, b',').expect("csv should be written");
        let csv = String::from_utf8(out).expect("utf-8");
        assert_eq!(csv, "Date,Debit,Credit\n01/04,10\n02/04,,5\n");
    }

    #[test]
    fn writes_one_record_per_detail() {
        let details = vec![
            MetadataPair::new("Account No", " 12345"),
            MetadataPair::new("Name", " A, B"),
        ];

        let mut out = Vec::new();
        write_details_csv(&mut out, &details, b';').expect("csv should be written");
        let csv = String::from_utf8(out).expect("utf-8");
        assert_eq!(csv, "Account No; 12345\nName; A, B\n");
    }
}
