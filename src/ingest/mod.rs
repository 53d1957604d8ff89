//! Upload ingestion: turn a raw byte stream with a declared format into an
//! ordered sequence of lead records.
//!
//! Parsing is a pure fold over the reader: the whole outcome (records plus
//! skipped-row notes) is returned in one value, nothing accumulates in
//! shared state. Row order always matches file order.

mod csv;
mod sheet;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Header names are matched exactly, case-sensitive.
pub const HEADER_FIRST_NAME: &str = "FirstName";
pub const HEADER_PHONE: &str = "Phone";
pub const HEADER_NOTES: &str = "Notes";

/// One contact from an uploaded file. `phone` and `notes` are carried
/// verbatim; no format validation happens at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub first_name: String,
    pub phone: String,
    pub notes: String,
}

/// Declared format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Xls,
    Xlsx,
}

impl UploadFormat {
    /// Resolve the format from the declared media type, falling back to the
    /// filename extension. Content sniffing is deliberately not done here;
    /// the caller declared what it sent.
    pub fn from_declared(
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<Self, ParseError> {
        if let Some(ct) = content_type {
            // Strip any ";charset=..." parameter.
            let mime = ct.split(';').next().unwrap_or(ct).trim();
            match mime {
                "text/csv" | "application/csv" => return Ok(Self::Csv),
                "application/vnd.ms-excel" => return Ok(Self::Xls),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                    return Ok(Self::Xlsx)
                }
                "application/octet-stream" | "" => {}
                other if filename.is_none() => {
                    return Err(ParseError::UnsupportedFormat(other.to_string()))
                }
                _ => {}
            }
        }
        match filename.and_then(|f| f.rsplit('.').next()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("xls") => Ok(Self::Xls),
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Ok(Self::Xlsx),
            Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
            None => Err(ParseError::UnsupportedFormat("unknown".to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Xls => "XLS",
            Self::Xlsx => "XLSX",
        }
    }
}

/// A row that was dropped without aborting the run.
#[derive(Debug, Clone)]
pub struct RowSkip {
    /// 1-based line/row number in the uploaded file (the header is row 1).
    pub row: u64,
    pub message: String,
}

/// Result of parsing one upload.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<LeadRecord>,
    pub skipped: Vec<RowSkip>,
}

/// Parse an upload into lead records.
///
/// Fatal only when the bytes cannot be decoded as the declared format at
/// all, or when the header row carries none of the known column names.
/// Individual malformed rows are skipped and reported in the outcome.
pub fn parse_leads(bytes: &[u8], format: UploadFormat) -> Result<ParseOutcome, ParseError> {
    match format {
        UploadFormat::Csv => csv::parse(bytes),
        UploadFormat::Xls | UploadFormat::Xlsx => sheet::parse(bytes, format),
    }
}

/// Resolved positions of the known columns within a header row.
///
/// Matching is by name, not position, so `Phone,Notes,FirstName` works. A
/// known column that is absent maps its field to an empty string on every
/// row rather than failing.
#[derive(Debug)]
struct ColumnMap {
    first_name: Option<usize>,
    phone: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    fn resolve<'a>(headers: impl Iterator<Item = &'a str>) -> Result<Self, ParseError> {
        let mut map = Self {
            first_name: None,
            phone: None,
            notes: None,
        };
        let mut found = Vec::new();
        for (idx, name) in headers.enumerate() {
            match name.trim() {
                HEADER_FIRST_NAME => map.first_name = Some(idx),
                HEADER_PHONE => map.phone = Some(idx),
                HEADER_NOTES => map.notes = Some(idx),
                other => {
                    if !other.is_empty() {
                        found.push(other.to_string());
                    }
                    continue;
                }
            }
        }
        if map.first_name.is_none() && map.phone.is_none() && map.notes.is_none() {
            return Err(ParseError::MissingHeader { found });
        }
        Ok(map)
    }

    /// Build a record from a row, looking fields up by resolved position.
    fn lead<'a>(&self, get: impl Fn(usize) -> Option<&'a str>) -> LeadRecord {
        let field = |pos: Option<usize>| {
            pos.and_then(&get)
                .map(str::to_string)
                .unwrap_or_default()
        };
        LeadRecord {
            first_name: field(self.first_name),
            phone: field(self.phone),
            notes: field(self.notes),
        }
    }
}
