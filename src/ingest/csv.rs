use crate::error::ParseError;

use super::{ColumnMap, ParseOutcome, RowSkip};

/// Parse a CSV byte stream.
///
/// The first row is the header. Rows with the wrong field count or invalid
/// UTF-8 are skipped and recorded; truly empty lines are dropped silently
/// by the reader.
pub(super) fn parse(bytes: &[u8]) -> Result<ParseOutcome, ParseError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Undecodable {
            format: "CSV".to_string(),
            reason: e.to_string(),
        })?
        .clone();
    let columns = ColumnMap::resolve(headers.iter())?;

    let mut outcome = ParseOutcome::default();
    for result in reader.records() {
        match result {
            Ok(record) => {
                let row = columns.lead(|idx| record.get(idx));
                outcome.records.push(row);
            }
            Err(err) => {
                let row = err
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(outcome.records.len() as u64 + 2);
                tracing::debug!(row, error = %err, "Skipping malformed CSV row");
                outcome.skipped.push(RowSkip {
                    row,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}
