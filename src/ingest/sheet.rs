use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::ParseError;

use super::{ColumnMap, LeadRecord, ParseOutcome, UploadFormat};

/// Parse an XLS/XLSX workbook from memory. The first worksheet is read; its
/// first row is the header, matched by the same case-sensitive names as CSV.
pub(super) fn parse(bytes: &[u8], format: UploadFormat) -> Result<ParseOutcome, ParseError> {
    let undecodable = |reason: String| ParseError::Undecodable {
        format: format.as_str().to_string(),
        reason,
    };

    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| undecodable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| undecodable("workbook contains no worksheets".to_string()))?
        .map_err(|e| undecodable(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(cell_text).collect(),
        None => return Err(ParseError::MissingHeader { found: Vec::new() }),
    };
    let columns = ColumnMap::resolve(header.iter().map(String::as_str))?;

    let mut outcome = ParseOutcome::default();
    for cells in rows {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let values: Vec<String> = cells.iter().map(cell_text).collect();
        let record: LeadRecord = columns.lead(|idx| values.get(idx).map(String::as_str));
        outcome.records.push(record);
    }

    Ok(outcome)
}

/// Render a cell as the text the uploader saw. Numeric phone columns are
/// common in spreadsheets, so integral floats print without a trailing ".0".
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
