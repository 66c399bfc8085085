use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use logboat_parser::{select_message_rows, TIMESTAMP_COLUMN};
use polars::prelude::*;

use crate::config::SpeedUnit;
use crate::error::{PipelineError, Result};
use crate::stops::TimeRange;
use crate::trajectory::normalize_degrees;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: NaiveDateTime,
    pub value: f64,
}

/// A field value that could not be read as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSample {
    pub time: NaiveDateTime,
    pub raw: String,
}

/// Time-sorted numeric samples of one field of one message type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorStream {
    samples: Vec<Sample>,
}

impl SensorStream {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|sample| sample.time);
        Self { samples }
    }

    /// Reads `field` from the `message` rows of a log frame. Rows with an empty or NaN field
    /// are skipped; a field column that is absent while messages exist is an error, as is
    /// any value that is not a number.
    pub fn from_messages(df: &DataFrame, message: &str, field: &str) -> Result<Self> {
        let (stream, rejected) = Self::from_messages_lenient(df, message, field)?;
        match rejected.into_iter().next() {
            Some(bad) => Err(PipelineError::InvalidValue {
                message: message.to_string(),
                field: field.to_string(),
                value: bad.raw,
            }),
            None => Ok(stream),
        }
    }

    /// Like [`SensorStream::from_messages`], but collects unreadable values instead of
    /// failing on the first one.
    pub fn from_messages_lenient(
        df: &DataFrame,
        message: &str,
        field: &str,
    ) -> Result<(Self, Vec<RejectedSample>)> {
        let rows = select_message_rows(df, message)?;
        if rows.height() == 0 {
            return Ok((Self::default(), Vec::new()));
        }

        let values = field_column(&rows, message, field)?.str()?;
        let times = rows.column(TIMESTAMP_COLUMN)?.datetime()?;

        let mut samples = Vec::with_capacity(rows.height());
        let mut rejected = Vec::new();
        for idx in 0..rows.height() {
            let (Some(micros), Some(raw)) = (times.get(idx), values.get(idx)) else {
                continue;
            };
            let Some(time) = DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
            else {
                continue;
            };
            match parse_measurement(raw) {
                Some(value) if value.is_finite() => samples.push(Sample { time, value }),
                Some(_) => {}
                None => rejected.push(RejectedSample {
                    time,
                    raw: raw.to_string(),
                }),
            }
        }

        Ok((Self::new(samples), rejected))
    }

    /// Converts every sample from `unit` to metres per second.
    pub fn in_unit(mut self, unit: SpeedUnit) -> Self {
        for sample in &mut self.samples {
            sample.value = unit.to_metres_per_second(sample.value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples with `range.start <= time <= range.end`.
    pub fn window(&self, range: &TimeRange) -> &[Sample] {
        let from = self.samples.partition_point(|s| s.time < range.start);
        let to = self.samples.partition_point(|s| s.time <= range.end);
        if to <= from {
            &[]
        } else {
            &self.samples[from..to]
        }
    }
}

pub(crate) fn field_column<'a>(
    rows: &'a DataFrame,
    message: &str,
    field: &str,
) -> Result<&'a Column> {
    rows.column(field).map_err(|_| PipelineError::MissingField {
        message: message.to_string(),
        field: field.to_string(),
    })
}

/// Reads a number that may carry a trailing unit, e.g. `2.4 kn` or `315.0 deg`.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Some(value);
    }
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok()
}

pub fn mean(samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64)
}

/// Mean of angles in degrees via unit vectors, in `[0, 360)`. `None` when the angles cancel out.
pub fn circular_mean(samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let (sin, cos) = samples.iter().fold((0.0_f64, 0.0_f64), |(sin, cos), s| {
        let radians = s.value.to_radians();
        (sin + radians.sin(), cos + radians.cos())
    });
    if sin.abs() < 1e-12 && cos.abs() < 1e-12 {
        return None;
    }
    Some(normalize_degrees(sin.atan2(cos).to_degrees()))
}

pub fn mean_speed_through_water(stream: &SensorStream, range: &TimeRange) -> Option<f64> {
    mean(stream.window(range))
}

pub fn mean_bearing(stream: &SensorStream, range: &TimeRange) -> Option<f64> {
    circular_mean(stream.window(range))
}

/// Mean wind direction (circular) and mean wind speed over the range.
pub fn mean_wind(
    direction: &SensorStream,
    speed: &SensorStream,
    range: &TimeRange,
) -> (Option<f64>, Option<f64>) {
    (
        circular_mean(direction.window(range)),
        mean(speed.window(range)),
    )
}

/// Whether a transect's speed through water should be looked at by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCheck {
    /// Speed through water within tolerance of speed over ground.
    Consistent,
    /// Outside tolerance, or no water-speed samples during the transect.
    Review,
    /// The log carries no water-speed messages.
    NoData,
    /// An auxiliary stream could not be read.
    Error,
}

impl ManualCheck {
    pub fn assess(speed_water: Option<f64>, speed: Option<f64>, tolerance: f64) -> Self {
        match (speed_water, speed) {
            (Some(water), Some(ground))
                if (1.0 - tolerance) * ground <= water && water <= (1.0 + tolerance) * ground =>
            {
                ManualCheck::Consistent
            }
            _ => ManualCheck::Review,
        }
    }

    /// CSV representation: `False`, `True`, empty or `Error occurred`.
    pub fn as_csv(&self) -> Option<&'static str> {
        match self {
            ManualCheck::Consistent => Some("False"),
            ManualCheck::Review => Some("True"),
            ManualCheck::NoData => None,
            ManualCheck::Error => Some("Error occurred"),
        }
    }
}

impl fmt::Display for ManualCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_csv().unwrap_or("-"))
    }
}
