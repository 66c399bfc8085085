use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{info, warn};

use crate::outputs::TRANSECTS_FILE;
use crate::trajectory::format_segment_time;

pub const AGGREGATE_FILE: &str = "aggregate_trajectories.csv";

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid session search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: traj_id '{traj_id}' is not '<boat>_<start time>'")]
    InvalidTrajectoryId { path: PathBuf, traj_id: String },
    #[error("failed to write aggregate table: {0}")]
    Write(#[from] csv::Error),
}

/// One row of a session's `trajectories.csv`; columns not listed here are ignored.
#[derive(Debug, Clone, Deserialize)]
struct TrajectoryRecord {
    traj_id: String,
    length: Option<f64>,
    direction: Option<f64>,
    duration: Option<f64>,
    speed: Option<f64>,
    speed_water: Option<f64>,
    bearing: Option<f64>,
    wind_direction: Option<f64>,
    wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    #[serde(rename = "Boat")]
    pub boat: String,
    #[serde(rename = "Start time", serialize_with = "serialize_time")]
    pub start_time: NaiveDateTime,
    #[serde(rename = "Length [m]")]
    pub length_m: Option<f64>,
    #[serde(rename = "Direction [deg]")]
    pub direction_deg: Option<f64>,
    #[serde(rename = "Duration [s]")]
    pub duration_s: Option<f64>,
    #[serde(rename = "Speed [m/s]")]
    pub speed: Option<f64>,
    #[serde(rename = "Speed through Water [m/s]")]
    pub speed_water: Option<f64>,
    #[serde(rename = "Avg Bearing [deg]")]
    pub bearing: Option<f64>,
    #[serde(rename = "Avg Wind Direction [deg]")]
    pub wind_direction: Option<f64>,
    #[serde(rename = "Avg Wind Speed [m/s]")]
    pub wind_speed: Option<f64>,
}

fn serialize_time<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_segment_time(*time))
}

/// Reads `YYMMDD` from the start of a session directory name.
pub fn session_date(dir_name: &str) -> Option<NaiveDate> {
    let prefix = dir_name.get(..6)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + prefix[..2].parse::<i32>().ok()?;
    let month = prefix[2..4].parse::<u32>().ok()?;
    let day = prefix[4..6].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Splits `<boat>_<start time>` at the last underscore, so boat names may contain underscores.
pub fn split_trajectory_id(traj_id: &str) -> Option<(&str, NaiveDateTime)> {
    let (boat, time) = traj_id.rsplit_once('_')?;
    let start = NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    Some((boat, start))
}

/// Collects the transects of every session directory under `root`, sorted by start time.
pub fn aggregate_sessions(root: &Path) -> Result<Vec<AggregateRow>, AggregateError> {
    let pattern = format!(
        "{}/*/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        TRANSECTS_FILE
    );

    let mut rows = Vec::new();
    let mut sessions = 0usize;
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "Could not read session path");
                continue;
            }
        };
        let Some(dir_name) = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
        else {
            continue;
        };
        let Some(date) = session_date(dir_name) else {
            warn!(dir = dir_name, "Skipping session directory without a YYMMDD prefix");
            continue;
        };

        rows.extend(read_session_rows(&path, date)?);
        sessions += 1;
    }

    rows.sort_by_key(|row| row.start_time);
    info!(root = %root.display(), sessions, transects = rows.len(), "Aggregated sessions");
    Ok(rows)
}

fn read_session_rows(path: &Path, date: NaiveDate) -> Result<Vec<AggregateRow>, AggregateError> {
    let csv_error = |source: csv::Error| AggregateError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<TrajectoryRecord>() {
        let record = record.map_err(csv_error)?;
        let (boat, logged) = split_trajectory_id(&record.traj_id).ok_or_else(|| {
            AggregateError::InvalidTrajectoryId {
                path: path.to_path_buf(),
                traj_id: record.traj_id.clone(),
            }
        })?;
        // Logger clocks drift; the directory date is authoritative.
        let start_time = date.and_time(logged.time());

        rows.push(AggregateRow {
            boat: boat.to_string(),
            start_time,
            length_m: record.length,
            direction_deg: record.direction,
            duration_s: record.duration,
            speed: record.speed,
            speed_water: record.speed_water,
            bearing: record.bearing,
            wind_direction: record.wind_direction,
            wind_speed: record.wind_speed,
        });
    }
    Ok(rows)
}

pub const AGGREGATE_COLUMNS: [&str; 10] = [
    "Boat",
    "Start time",
    "Length [m]",
    "Direction [deg]",
    "Duration [s]",
    "Speed [m/s]",
    "Speed through Water [m/s]",
    "Avg Bearing [deg]",
    "Avg Wind Direction [deg]",
    "Avg Wind Speed [m/s]",
];

/// Writes the aggregate table; the header is written even when there are no rows.
pub fn write_aggregate_csv(path: &Path, rows: &[AggregateRow]) -> Result<(), AggregateError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record(AGGREGATE_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
