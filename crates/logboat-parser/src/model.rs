use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column holding the parsed message time (Datetime, microseconds, naive).
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Column holding the NMEA 2000 message name, e.g. `Position, Rapid Update`.
pub const MESSAGE_COLUMN: &str = "message";

/// Names of the export columns that carry the message time and message name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogLayout {
    pub time_column: String,
    pub name_column: String,
}

impl Default for LogLayout {
    fn default() -> Self {
        Self {
            time_column: "Time".to_string(),
            name_column: "Name".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationLog {
    pub file_hash: String,
    pub df: DataFrame,
    pub skipped_rows: usize,
}

impl NavigationLog {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Distinct message names in order of first appearance.
    pub fn message_names(&self) -> Result<Vec<String>, PolarsError> {
        let messages = self.df.column(MESSAGE_COLUMN)?.str()?;
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for name in messages.into_iter().flatten() {
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn messages(&self, name: &str) -> Result<DataFrame, PolarsError> {
        select_messages(&self.df, name)
    }
}

/// Rows of a single message type with every column kept.
pub fn select_message_rows(df: &DataFrame, name: &str) -> Result<DataFrame, PolarsError> {
    df.clone()
        .lazy()
        .filter(col(MESSAGE_COLUMN).eq(lit(name)))
        .collect()
}

/// Rows of a single message type, keeping only the field columns that are populated on every
/// one of those rows.
pub fn select_messages(df: &DataFrame, name: &str) -> Result<DataFrame, PolarsError> {
    drop_sparse_columns(select_message_rows(df, name)?)
}

pub fn drop_sparse_columns(df: DataFrame) -> Result<DataFrame, PolarsError> {
    let kept: Vec<Column> = df
        .get_columns()
        .iter()
        .filter(|column| {
            let name = column.name().as_str();
            name == TIMESTAMP_COLUMN || name == MESSAGE_COLUMN || column.null_count() == 0
        })
        .cloned()
        .collect();
    DataFrame::new(kept)
}
