use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use logboat_parser::{parse_log_time, LogLayout};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid position pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Unit a logger writes speeds in; values are converted to metres per second on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeedUnit {
    #[default]
    #[serde(rename = "m/s", alias = "mps")]
    MetresPerSecond,
    #[serde(rename = "kn", alias = "knots", alias = "kt")]
    Knots,
    #[serde(rename = "km/h", alias = "kph")]
    KilometresPerHour,
}

impl SpeedUnit {
    pub fn to_metres_per_second(&self, value: f64) -> f64 {
        match self {
            SpeedUnit::MetresPerSecond => value,
            SpeedUnit::Knots => value * 1852.0 / 3600.0,
            SpeedUnit::KilometresPerHour => value / 3.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedUnit::MetresPerSecond => "m/s",
            SpeedUnit::Knots => "kn",
            SpeedUnit::KilometresPerHour => "km/h",
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stop-splitter parameters: a stop is at least `min_duration_s` spent inside `max_diameter_m`,
/// and transects shorter than `min_length_m` are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub min_duration_s: f64,
    pub max_diameter_m: f64,
    pub min_length_m: f64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            min_duration_s: 60.0,
            max_diameter_m: 50.0,
            min_length_m: 300.0,
        }
    }
}

impl SplitterConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::microseconds((self.min_duration_s * 1_000_000.0).round() as i64)
    }
}

/// Message names and field columns of the NMEA 2000 export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub position: String,
    pub latitude_field: String,
    pub longitude_field: String,
    pub water_speed: String,
    pub water_speed_field: String,
    pub water_speed_unit: SpeedUnit,
    pub heading: String,
    pub heading_field: String,
    pub wind: String,
    pub wind_speed_field: String,
    pub wind_direction_field: String,
    pub wind_speed_unit: SpeedUnit,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            position: "Position, Rapid Update".to_string(),
            latitude_field: "Latitude".to_string(),
            longitude_field: "Longitude".to_string(),
            water_speed: "Speed, Water Referenced".to_string(),
            water_speed_field: "Speed Water Referenced".to_string(),
            water_speed_unit: SpeedUnit::MetresPerSecond,
            heading: "Vessel Heading".to_string(),
            heading_field: "Heading".to_string(),
            wind: "Wind Data".to_string(),
            wind_speed_field: "Wind Speed".to_string(),
            wind_direction_field: "Wind Angle".to_string(),
            wind_speed_unit: SpeedUnit::MetresPerSecond,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Relative tolerance between speed through water and speed over ground.
    pub speed_tolerance: f64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            speed_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub log: LogLayout,
    pub splitter: SplitterConfig,
    pub messages: MessageConfig,
    pub check: CheckConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_config(path)?;
        Self::from_toml_str(&content, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let splitter = &self.splitter;
        if !(splitter.min_duration_s > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "splitter.min_duration_s must be positive, got {}",
                splitter.min_duration_s
            )));
        }
        if !(splitter.max_diameter_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "splitter.max_diameter_m must be positive, got {}",
                splitter.max_diameter_m
            )));
        }
        if !(splitter.min_length_m >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "splitter.min_length_m must not be negative, got {}",
                splitter.min_length_m
            )));
        }
        if !(self.check.speed_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "check.speed_tolerance must not be negative, got {}",
                self.check.speed_tolerance
            )));
        }
        Ok(())
    }
}

/// Regular expressions searched in the raw latitude/longitude strings before conversion.
#[derive(Debug, Clone, Default)]
pub struct PositionFilter {
    latitude_exclude: Option<Regex>,
    longitude_require: Option<Regex>,
}

impl PositionFilter {
    /// Rows whose latitude matches `latitude_exclude` are dropped; when `longitude_require`
    /// is set, only rows whose longitude matches it are kept. Empty patterns are ignored.
    pub fn new(
        latitude_exclude: Option<&str>,
        longitude_require: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            latitude_exclude: compile_pattern(latitude_exclude)?,
            longitude_require: compile_pattern(longitude_require)?,
        })
    }

    pub fn latitude_exclude(&self) -> Option<&str> {
        self.latitude_exclude.as_ref().map(Regex::as_str)
    }

    pub fn longitude_require(&self) -> Option<&str> {
        self.longitude_require.as_ref().map(Regex::as_str)
    }

    pub fn accepts(&self, latitude: &str, longitude: &str) -> bool {
        if let Some(pattern) = &self.latitude_exclude {
            if pattern.is_match(latitude) {
                return false;
            }
        }
        if let Some(pattern) = &self.longitude_require {
            if !pattern.is_match(longitude) {
                return false;
            }
        }
        true
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => Regex::new(pattern)
            .map(Some)
            .map_err(|source| ConfigError::Pattern {
                pattern: pattern.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Closed time interval; `end: None` runs to the end of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && self.end.map_or(true, |end| time <= end)
    }
}

/// One outing of one boat.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    pub log: PathBuf,
    #[serde(deserialize_with = "deserialize_log_time")]
    pub start: NaiveDateTime,
    #[serde(default, deserialize_with = "deserialize_optional_log_time")]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub latitude_exclude: Option<String>,
    #[serde(default)]
    pub longitude_require: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }

    pub fn position_filter(&self) -> Result<PositionFilter, ConfigError> {
        PositionFilter::new(
            self.latitude_exclude.as_deref(),
            self.longitude_require.as_deref(),
        )
    }

    /// `<root>/<YYMMDD>_<name>` unless the session names its own directory.
    pub fn resolve_output_dir(&self, root: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(format!("{}_{}", self.start.format("%y%m%d"), self.name)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionManifest {
    #[serde(default)]
    pub output_root: Option<PathBuf>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default, rename = "session")]
    pub sessions: Vec<SessionConfig>,
}

impl SessionManifest {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let manifest: SessionManifest =
            toml::from_str(content).map_err(|source| ConfigError::Toml {
                path: origin.to_path_buf(),
                source,
            })?;
        manifest.analysis.validate()?;

        for session in &manifest.sessions {
            if session.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "session for log {} has an empty name",
                    session.log.display()
                )));
            }
            if let Some(end) = session.end {
                if end < session.start {
                    return Err(ConfigError::Invalid(format!(
                        "session '{}' ends at {end} before it starts at {}",
                        session.name, session.start
                    )));
                }
            }
            session.position_filter()?;
        }

        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_config(path)?;
        Self::from_toml_str(&content, path)
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn deserialize_log_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_log_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized time '{raw}'")))
}

fn deserialize_optional_log_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_log_time(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized time '{raw}'"))),
        None => Ok(None),
    }
}
