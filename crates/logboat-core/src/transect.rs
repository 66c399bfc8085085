use logboat_parser::TIMESTAMP_COLUMN;
use polars::prelude::*;

use crate::config::TimeWindow;
use crate::error::{PipelineError, Result};

/// Keeps the rows of `df` whose `timestamp` falls inside `window` (both bounds inclusive).
pub fn cut_transect(df: &DataFrame, window: &TimeWindow) -> Result<DataFrame> {
    if let Some(end) = window.end {
        if end < window.start {
            return Err(PipelineError::InvalidWindow {
                start: window.start,
                end,
            });
        }
    }

    let timestamp = col(TIMESTAMP_COLUMN);
    let mut predicate = timestamp.clone().gt_eq(lit(window.start));
    if let Some(end) = window.end {
        predicate = predicate.and(timestamp.lt_eq(lit(end)));
    }

    Ok(df.clone().lazy().filter(predicate).collect()?)
}
