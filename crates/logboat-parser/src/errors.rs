use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("log file is empty")]
    EmptyInput,

    #[error("header row invalid: {message}")]
    InvalidHeader { message: String },

    #[error("required column '{column}' missing from header")]
    MissingColumn { column: String },

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("failed to build log dataframe: {message}")]
    Validation { message: String },

    #[error("log file did not contain any data rows ({skipped} rows skipped)")]
    EmptyData { skipped: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate '{input}' must look like 48°36.05' N")]
    Malformed { input: String },

    #[error("coordinate '{input}' has invalid {part} '{value}'")]
    InvalidNumber {
        input: String,
        part: &'static str,
        value: String,
    },

    #[error("coordinate '{input}' has unknown hemisphere '{direction}'")]
    UnknownDirection { input: String, direction: String },
}
