// crates/logboat-core/src/error.rs

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Navigation log could not be parsed: {0}")]
    Parser(#[from] logboat_parser::ParserError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Time window ends at {end} before it starts at {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Session '{session}' has {fixes} usable position fixes; at least 2 are needed")]
    InsufficientFixes { session: String, fixes: usize },

    #[error("Message '{message}' has no field '{field}'")]
    MissingField { message: String, field: String },

    #[error("Message '{message}' field '{field}' holds non-numeric value '{value}'")]
    InvalidValue {
        message: String,
        field: String,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
