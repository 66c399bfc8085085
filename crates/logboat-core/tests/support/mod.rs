#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use logboat_core::trajectory::Fix;

pub const START_LAT: f64 = 48.6;
pub const START_LON: f64 = -4.2;
const METRES_PER_DEG_LAT: f64 = 111_200.0;

pub fn at(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 12)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        + Duration::seconds(seconds)
}

fn metres_per_deg_lon() -> f64 {
    111_320.0 * START_LAT.to_radians().cos()
}

/// Offset in metres (east, north) from the start point at second `t` of the survey track:
/// east at 2 m/s until 300 s, parked with a metre of jitter until 480 s, then north at 2 m/s.
pub fn track_offset(t: i64) -> (f64, f64) {
    match t {
        t if t <= 300 => (2.0 * t as f64, 0.0),
        t if t <= 480 => {
            let jitter = ((t * 7) % 3 - 1) as f64;
            (600.0 + jitter, jitter)
        }
        t => (600.0, 2.0 * (t - 480) as f64),
    }
}

pub fn track_position(t: i64) -> (f64, f64) {
    let (east, north) = track_offset(t);
    (
        START_LAT + north / METRES_PER_DEG_LAT,
        START_LON + east / metres_per_deg_lon(),
    )
}

pub fn survey_fixes(until: i64) -> Vec<Fix> {
    (0..=until)
        .map(|t| {
            let (lat, lon) = track_position(t);
            Fix::new(at(t), lat, lon)
        })
        .collect()
}

/// Straight eastward run at 2 m/s without stops.
pub fn straight_fixes(seconds: i64) -> Vec<Fix> {
    (0..=seconds)
        .map(|t| {
            Fix::new(
                at(t),
                START_LAT,
                START_LON + 2.0 * t as f64 / metres_per_deg_lon(),
            )
        })
        .collect()
}

pub fn format_coordinate(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let magnitude = value.abs();
    let degrees = magnitude.trunc();
    let minutes = (magnitude - degrees) * 60.0;
    format!("{:03}°{:07.4}' {}", degrees as u32, minutes, hemisphere)
}

pub const HEADER: &str =
    "Time,Name,Latitude,Longitude,Heading,Speed Water Referenced,Wind Speed,Wind Angle";

/// NMEA 2000 export of the survey track: one position and one water-speed message per second,
/// heading and wind every ten seconds. Water speed matches the ground speed on the eastward
/// leg and is well below it on the northward leg.
pub fn survey_log_csv(until: i64) -> String {
    let mut lines = vec![HEADER.to_string()];
    for t in 0..=until {
        let time = at(t).format("%Y-%m-%d %H:%M:%S%.3f");
        let (lat, lon) = track_position(t);
        lines.push(format!(
            "{time},\"Position, Rapid Update\",{},{},,,,",
            format_coordinate(lat, 'N', 'S'),
            format_coordinate(lon, 'E', 'W'),
        ));
        let water = if t <= 300 { 2.05 } else { 1.2 };
        lines.push(format!("{time},\"Speed, Water Referenced\",,,,{water},,"));
        if t % 10 == 5 {
            let heading = if t <= 300 { 90.0 } else { 0.0 };
            lines.push(format!("{time},Vessel Heading,,,{heading},,,"));
            let angle = if t % 20 == 5 { 350.0 } else { 10.0 };
            lines.push(format!("{time},Wind Data,,,,,4.0,{angle}"));
        }
    }
    lines.join("\n")
}
