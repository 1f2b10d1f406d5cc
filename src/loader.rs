// File loading: format detection, text decoding and parsing into datasets

use crate::data::{Dataset, Value};
use crate::error::{PivotError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A named byte stream handed to the loader
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after its final path component
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn format(&self) -> Option<FileFormat> {
        FileFormat::from_name(&self.name)
    }
}

/// Formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Infer the format from a file name's extension (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(FileFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// The text encoding a CSV file was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Load one file into a dataset
pub fn load(file: &UploadedFile) -> Result<Dataset> {
    let dataset = match file.format() {
        Some(FileFormat::Csv) => {
            let (text, encoding) =
                decode_text(&file.bytes).ok_or_else(|| PivotError::DecodeFailure {
                    file: file.name.clone(),
                })?;
            debug!(file = %file.name, ?encoding, "Decoded CSV text");
            read_csv(&file.name, &text)?
        }
        Some(FileFormat::Spreadsheet) => read_spreadsheet(&file.name, &file.bytes)?,
        None => {
            return Err(PivotError::UnsupportedFormat {
                file: file.name.clone(),
            })
        }
    };

    info!(
        file = %file.name,
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Loaded file"
    );
    Ok(dataset)
}

/// Decode bytes as UTF-8, retrying once with the single-byte Western fallback
pub fn decode_text(bytes: &[u8]) -> Option<(Cow<'_, str>, TextEncoding)> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(body) {
        return Some((text, TextEncoding::Utf8));
    }

    debug!("UTF-8 decode failed, retrying as Latin-1");
    WINDOWS_1252
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| (text, TextEncoding::Latin1))
}

/// Parse decoded CSV text; the first record is the header
fn read_csv(file_name: &str, text: &str) -> Result<Dataset> {
    let csv_error = |source: csv::Error| PivotError::Csv {
        file: file_name.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        return Err(PivotError::EmptyFile {
            file: file_name.to_string(),
        });
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        records.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(Dataset::from_records(name_headers(headers), records))
}

/// Read the first worksheet; the first row is the header
fn read_spreadsheet(file_name: &str, bytes: &[u8]) -> Result<Dataset> {
    let spreadsheet_error = |message: String| PivotError::Spreadsheet {
        file: file_name.to_string(),
        message,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| spreadsheet_error("workbook has no worksheets".to_string()))?
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => {
            return Err(PivotError::EmptyFile {
                file: file_name.to_string(),
            })
        }
    };

    let body: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(Dataset::new(name_headers(headers), body))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Empty | Data::Error(_) => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

/// Give blank header cells a positional name and suffix repeated names
/// (`a`, `a.1`, `a.2`) so every column stays addressable
fn name_headers(headers: Vec<String>) -> Vec<String> {
    let mut named: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, h) in headers.into_iter().enumerate() {
        let base = if h.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            h
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while named.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        named.push(name);
    }
    named
}
