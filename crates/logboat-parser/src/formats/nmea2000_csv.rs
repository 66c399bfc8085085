use csv::{ReaderBuilder, StringRecord};
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::{LogLayout, NavigationLog, MESSAGE_COLUMN, TIMESTAMP_COLUMN};

use super::common::{clean_optional, decode_text, dedupe_header, parse_log_time};

/// Where the time and message-name columns sit in the header; every other column is a field.
struct HeaderLayout {
    time_index: usize,
    name_index: usize,
    fields: Vec<(usize, String)>,
    width: usize,
}

impl HeaderLayout {
    fn classify(header: &StringRecord, layout: &LogLayout) -> Result<Self, ParserError> {
        let names = dedupe_header(header.iter().map(|name| name.trim().to_string()).collect());
        if names.iter().all(String::is_empty) {
            return Err(ParserError::InvalidHeader {
                message: "header row has no column names".to_string(),
            });
        }

        let find = |wanted: &str| {
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| ParserError::MissingColumn {
                    column: wanted.to_string(),
                })
        };
        let time_index = find(layout.time_column.as_str())?;
        let name_index = find(layout.name_column.as_str())?;

        let fields = names
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != time_index && *idx != name_index && !name.is_empty())
            .filter(|(_, name)| {
                name.as_str() != TIMESTAMP_COLUMN && name.as_str() != MESSAGE_COLUMN
            })
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        Ok(Self {
            time_index,
            name_index,
            fields,
            width: names.len(),
        })
    }
}

/// Reads a CSV export of an NMEA 2000 logger into a [`NavigationLog`].
///
/// Rows whose width differs from the header, or whose time or message name cannot be read,
/// are skipped and counted in [`NavigationLog::skipped_rows`].
pub fn parse_navigation_log(
    bytes: &[u8],
    layout: &LogLayout,
) -> Result<NavigationLog, ParserError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParserError::EmptyInput);
    }

    let file_hash = blake3::hash(bytes).to_hex().to_string();
    let text = decode_text(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or(ParserError::EmptyInput)?
        .map_err(|source| ParserError::Csv { source })?;
    let header = HeaderLayout::classify(&header, layout)?;

    let mut timestamps: Vec<i64> = Vec::new();
    let mut messages: Vec<String> = Vec::new();
    let mut fields: Vec<Vec<Option<String>>> = vec![Vec::new(); header.fields.len()];
    let mut skipped = 0usize;

    for record in records {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        if record.len() != header.width {
            skipped += 1;
            continue;
        }

        let time = record.get(header.time_index).and_then(parse_log_time);
        let name = record.get(header.name_index).and_then(clean_optional);
        let (Some(time), Some(name)) = (time, name) else {
            skipped += 1;
            continue;
        };

        timestamps.push(time.and_utc().timestamp_micros());
        messages.push(name);
        for (values, (idx, _)) in fields.iter_mut().zip(&header.fields) {
            values.push(record.get(*idx).and_then(clean_optional));
        }
    }

    if timestamps.is_empty() {
        return Err(ParserError::EmptyData { skipped });
    }

    let df = build_log_dataframe(timestamps, messages, &header.fields, fields)?;

    Ok(NavigationLog {
        file_hash,
        df,
        skipped_rows: skipped,
    })
}

fn build_log_dataframe(
    timestamps: Vec<i64>,
    messages: Vec<String>,
    field_names: &[(usize, String)],
    fields: Vec<Vec<Option<String>>>,
) -> Result<DataFrame, ParserError> {
    let validation = |err: PolarsError| ParserError::Validation {
        message: err.to_string(),
    };

    let ts_series = Series::new(TIMESTAMP_COLUMN.into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(validation)?;

    let mut columns: Vec<Column> = Vec::with_capacity(field_names.len() + 2);
    columns.push(ts_series.into());

    let message_refs: Vec<&str> = messages.iter().map(String::as_str).collect();
    columns.push(Series::new(MESSAGE_COLUMN.into(), message_refs).into());

    for ((_, name), values) in field_names.iter().zip(&fields) {
        let refs: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
        columns.push(Series::new(name.as_str().into(), refs).into());
    }

    DataFrame::new(columns).map_err(validation)
}
