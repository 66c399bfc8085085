use chrono::NaiveDateTime;
use logboat_parser::{select_message_rows, NavigationLog};
use polars::prelude::*;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, SessionConfig, SpeedUnit, SplitterConfig, TimeWindow};
use crate::error::{PipelineError, Result};
use crate::features::{
    mean_bearing, mean_speed_through_water, mean_wind, ManualCheck, SensorStream,
};
use crate::positions::extract_positions;
use crate::stops::{StopSplitter, TimeRange};
use crate::trajectory::{format_segment_time, Trajectory};
use crate::transect::cut_transect;

/// Features of one transect.
#[derive(Debug, Clone, PartialEq)]
pub struct TransectSummary {
    pub traj_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub geometry: String,
    pub length_m: f64,
    pub direction_deg: f64,
    pub duration_s: f64,
    pub speed: Option<f64>,
    pub speed_water: Option<f64>,
    pub bearing: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub check: ManualCheck,
}

#[derive(Debug, Clone)]
pub struct SessionAnalysis {
    pub session: String,
    pub file_hash: String,
    pub window: TimeWindow,
    pub skipped_rows: usize,
    pub fix_count: usize,
    pub splitter: SplitterConfig,
    pub transects: Vec<TransectSummary>,
}

impl SessionAnalysis {
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = &self.transects;
        let text = |f: fn(&TransectSummary) -> String| rows.iter().map(f).collect::<Vec<_>>();
        let number = |f: fn(&TransectSummary) -> f64| rows.iter().map(f).collect::<Vec<_>>();
        let optional =
            |f: fn(&TransectSummary) -> Option<f64>| rows.iter().map(f).collect::<Vec<_>>();
        let checks: Vec<Option<&str>> = rows.iter().map(|t| t.check.as_csv()).collect();

        let columns: Vec<Column> = vec![
            Series::new("traj_id".into(), text(|t| t.traj_id.clone())).into(),
            Series::new("start_t".into(), text(|t| format_segment_time(t.start))).into(),
            Series::new("end_t".into(), text(|t| format_segment_time(t.end))).into(),
            Series::new("geometry".into(), text(|t| t.geometry.clone())).into(),
            Series::new("length".into(), number(|t| t.length_m)).into(),
            Series::new("direction".into(), number(|t| t.direction_deg)).into(),
            Series::new("duration".into(), number(|t| t.duration_s)).into(),
            Series::new("speed".into(), optional(|t| t.speed)).into(),
            Series::new("speed_water".into(), optional(|t| t.speed_water)).into(),
            Series::new("bearing".into(), optional(|t| t.bearing)).into(),
            Series::new("wind_direction".into(), optional(|t| t.wind_direction)).into(),
            Series::new("wind_speed".into(), optional(|t| t.wind_speed)).into(),
            Series::new("check_manually".into(), checks).into(),
        ];

        Ok(DataFrame::new(columns)?)
    }
}

/// An auxiliary stream that may have failed to load. Unreadable values only taint the
/// transects whose time range covers them.
struct AuxStream {
    stream: Option<SensorStream>,
    rejected: Vec<NaiveDateTime>,
    /// Whether the slice holds any rows of the message, readable or not.
    has_messages: bool,
}

impl AuxStream {
    fn load(df: &DataFrame, message: &str, field: &str, unit: Option<SpeedUnit>) -> Self {
        let has_messages = select_message_rows(df, message).is_ok_and(|rows| rows.height() > 0);
        match SensorStream::from_messages_lenient(df, message, field) {
            Ok((stream, rejected)) => {
                if let Some(first) = rejected.first() {
                    warn!(
                        message,
                        field,
                        rejected = rejected.len(),
                        value = %first.raw,
                        "Ignoring unreadable sensor values"
                    );
                }
                let stream = match unit {
                    Some(unit) => stream.in_unit(unit),
                    None => stream,
                };
                Self {
                    stream: Some(stream),
                    rejected: rejected.into_iter().map(|r| r.time).collect(),
                    has_messages,
                }
            }
            Err(err) => {
                warn!(message, field, error = %err, "Sensor stream unavailable");
                Self {
                    stream: None,
                    rejected: Vec::new(),
                    has_messages,
                }
            }
        }
    }

    /// The usable stream for `range`, or `None` when it failed to load or holds an
    /// unreadable value inside the range.
    fn for_range(&self, range: &TimeRange) -> Option<&SensorStream> {
        let stream = self.stream.as_ref()?;
        let tainted = self
            .rejected
            .iter()
            .any(|time| range.start <= *time && *time <= range.end);
        (!tainted).then_some(stream)
    }
}

/// Cuts one session out of a log, splits its track at stops and summarises every transect.
pub fn analyze_session(
    log: &NavigationLog,
    session: &SessionConfig,
    config: &AnalysisConfig,
) -> Result<SessionAnalysis> {
    let window = session.window();
    let slice = cut_transect(&log.df, &window)?;
    let messages = &config.messages;

    let fixes = extract_positions(&slice, messages, &session.position_filter()?)?;
    let fix_count = fixes.len();
    let trajectory = Trajectory::new(session.name.clone(), fixes).ok_or_else(|| {
        PipelineError::InsufficientFixes {
            session: session.name.clone(),
            fixes: fix_count,
        }
    })?;

    let legs = StopSplitter::new(&config.splitter).split(&trajectory);

    let water = AuxStream::load(
        &slice,
        &messages.water_speed,
        &messages.water_speed_field,
        Some(messages.water_speed_unit),
    );
    let heading = AuxStream::load(&slice, &messages.heading, &messages.heading_field, None);
    let wind_direction =
        AuxStream::load(&slice, &messages.wind, &messages.wind_direction_field, None);
    let wind_speed = AuxStream::load(
        &slice,
        &messages.wind,
        &messages.wind_speed_field,
        Some(messages.wind_speed_unit),
    );

    let tolerance = config.check.speed_tolerance;
    let transects: Vec<TransectSummary> = legs
        .iter()
        .map(|leg| {
            let range = TimeRange::new(leg.start_time(), leg.end_time());
            let duration_s = leg.duration_s();
            let length_m = leg.length();
            let speed = (duration_s > 0.0).then(|| length_m / duration_s);

            let (speed_water, mut check) = match water.for_range(&range) {
                None => (None, ManualCheck::Error),
                Some(_) if !water.has_messages => (None, ManualCheck::NoData),
                Some(stream) => {
                    let speed_water = mean_speed_through_water(stream, &range);
                    (speed_water, ManualCheck::assess(speed_water, speed, tolerance))
                }
            };

            let bearing = heading
                .for_range(&range)
                .and_then(|stream| mean_bearing(stream, &range));

            let (wind_direction, wind_speed) =
                match (wind_direction.for_range(&range), wind_speed.for_range(&range)) {
                    (Some(directions), Some(speeds)) => mean_wind(directions, speeds, &range),
                    _ => {
                        check = ManualCheck::Error;
                        (None, None)
                    }
                };

            TransectSummary {
                traj_id: leg.id.clone(),
                start: range.start,
                end: range.end,
                geometry: leg.to_wkt(),
                length_m,
                direction_deg: leg.direction(),
                duration_s,
                speed,
                speed_water,
                bearing,
                wind_direction,
                wind_speed,
                check,
            }
        })
        .collect();

    info!(
        session = %session.name,
        fixes = fix_count,
        transects = transects.len(),
        "Analyzed session"
    );

    Ok(SessionAnalysis {
        session: session.name.clone(),
        file_hash: log.file_hash.clone(),
        window,
        skipped_rows: log.skipped_rows,
        fix_count,
        splitter: config.splitter,
        transects,
    })
}
