use chrono::DateTime;
use logboat_parser::{parse_coordinate, select_message_rows, TIMESTAMP_COLUMN};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::config::{MessageConfig, PositionFilter};
use crate::error::Result;
use crate::features::field_column;
use crate::trajectory::Fix;

/// Position fixes from the position messages of a log frame, in time order.
///
/// Rows rejected by `filter`, rows without coordinates, and rows whose coordinates do not
/// convert are dropped.
pub fn extract_positions(
    df: &DataFrame,
    messages: &MessageConfig,
    filter: &PositionFilter,
) -> Result<Vec<Fix>> {
    let rows = select_message_rows(df, &messages.position)?;
    if rows.height() == 0 {
        return Ok(Vec::new());
    }

    let latitudes = field_column(&rows, &messages.position, &messages.latitude_field)?.str()?;
    let longitudes = field_column(&rows, &messages.position, &messages.longitude_field)?.str()?;
    let times = rows.column(TIMESTAMP_COLUMN)?.datetime()?;

    let mut fixes = Vec::with_capacity(rows.height());
    let mut filtered = 0usize;
    let mut unconvertible = 0usize;

    for idx in 0..rows.height() {
        let (Some(micros), Some(lat_text), Some(lon_text)) =
            (times.get(idx), latitudes.get(idx), longitudes.get(idx))
        else {
            filtered += 1;
            continue;
        };
        if !filter.accepts(lat_text, lon_text) {
            filtered += 1;
            continue;
        }
        let Some(time) = DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc()) else {
            filtered += 1;
            continue;
        };

        match (parse_coordinate(lat_text), parse_coordinate(lon_text)) {
            (Ok(latitude), Ok(longitude)) => fixes.push(Fix::new(time, latitude, longitude)),
            (Err(err), _) | (_, Err(err)) => {
                unconvertible += 1;
                warn!(%time, error = %err, "Skipping position with unreadable coordinate");
            }
        }
    }

    fixes.sort_by_key(|fix| fix.time);
    debug!(
        fixes = fixes.len(),
        filtered, unconvertible, "Extracted position fixes"
    );
    Ok(fixes)
}
