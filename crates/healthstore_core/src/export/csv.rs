//! CSV export/import of health records.

use super::TransferError;
use crate::model::health_record::HealthRecord;
use crate::model::UserId;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::io::{Read, Write};
use std::str::FromStr;

/// Header row written by [`write_records_csv`].
pub const CSV_HEADER: [&str; 5] = ["Date", "SBP", "DBP", "HR", "Weight"];

/// Writes `records` as CSV with a header row.
pub fn write_records_csv<W: Write>(writer: W, records: &[HealthRecord]) -> Result<(), TransferError> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for record in records {
        csv_writer.write_record([
            record.date.clone(),
            optional_cell(record.systolic),
            optional_cell(record.diastolic),
            optional_cell(record.heart_rate),
            optional_cell(record.weight),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders `records` as a CSV string.
pub fn records_to_csv(records: &[HealthRecord]) -> Result<String, TransferError> {
    let mut buffer = Vec::new();
    write_records_csv(&mut buffer, records)?;
    String::from_utf8(buffer)
        .map_err(|err| TransferError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}

/// Parses CSV into new records owned by `user_id`.
///
/// Columns are matched by header name, case-insensitively; only `Date` is
/// required. Rows with an empty date and repeated header rows are skipped.
/// Cells that do not parse as numbers become `None`. Dates are not validated
/// here; the store rejects malformed ones on insert.
pub fn read_records_csv<R: Read>(reader: R, user_id: UserId) -> Result<Vec<HealthRecord>, TransferError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = ColumnIndex::from_headers(csv_reader.headers()?)?;

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let date = row.get(columns.date).unwrap_or_default();
        if date.is_empty() || date.eq_ignore_ascii_case(CSV_HEADER[0]) {
            continue;
        }

        let mut record = HealthRecord::new(user_id, date);
        record.systolic = parse_cell(&row, columns.systolic);
        record.diastolic = parse_cell(&row, columns.diastolic);
        record.heart_rate = parse_cell(&row, columns.heart_rate);
        record.weight = parse_cell(&row, columns.weight);
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    systolic: Option<usize>,
    diastolic: Option<usize>,
    heart_rate: Option<usize>,
    weight: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, TransferError> {
        let find = |aliases: &[&str]| {
            headers.iter().position(|header| {
                aliases
                    .iter()
                    .any(|alias| header.trim().eq_ignore_ascii_case(alias))
            })
        };

        Ok(Self {
            date: find(&["date"]).ok_or(TransferError::MissingColumn("Date"))?,
            systolic: find(&["sbp", "systolic"]),
            diastolic: find(&["dbp", "diastolic"]),
            heart_rate: find(&["hr", "heart_rate", "heart rate", "pulse"]),
            weight: find(&["weight"]),
        })
    }
}

fn parse_cell<T: FromStr>(row: &StringRecord, index: Option<usize>) -> Option<T> {
    index
        .and_then(|index| row.get(index))
        .and_then(|value| value.trim().parse().ok())
}

fn optional_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}
