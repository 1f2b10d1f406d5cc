use thiserror::Error;

/// Errors raised while loading files and building pivot tables
#[derive(Error, Debug)]
pub enum PivotError {
    #[error("Unsupported file format: '{file}' (expected .csv, .xlsx, .xlsm, .xls or .ods)")]
    UnsupportedFormat { file: String },

    #[error("Failed to decode '{file}' as UTF-8 or Latin-1")]
    DecodeFailure { file: String },

    #[error("File '{file}' has no header row")]
    EmptyFile { file: String },

    #[error("Failed to parse CSV '{file}': {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read spreadsheet '{file}': {message}")]
    Spreadsheet { file: String, message: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Failed to parse '{value}' as number in column '{column}' at row {row}")]
    NonNumeric {
        value: String,
        column: String,
        row: usize,
    },

    #[error("Pivot requires at least one group-by column and a value column")]
    EmptySelection,

    #[error("Unknown aggregation '{0}' (expected sum, count, mean or distinct-count)")]
    UnknownAggregation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PivotError>;
