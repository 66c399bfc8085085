mod support;

use logboat_core::config::SpeedUnit;
use logboat_core::features::{
    circular_mean, mean_bearing, mean_speed_through_water, mean_wind, parse_measurement,
    ManualCheck, Sample, SensorStream,
};
use logboat_core::stops::TimeRange;
use logboat_core::PipelineError;
use logboat_parser::{parse_navigation_log, LogLayout};

use support::{at, HEADER};

fn stream(values: &[(i64, f64)]) -> SensorStream {
    SensorStream::new(
        values
            .iter()
            .map(|&(t, value)| Sample { time: at(t), value })
            .collect(),
    )
}

fn log(rows: &[&str]) -> logboat_parser::NavigationLog {
    let mut content = vec![HEADER];
    content.extend_from_slice(rows);
    parse_navigation_log(content.join("\n").as_bytes(), &LogLayout::default()).unwrap()
}

#[test]
fn window_is_inclusive_on_both_ends() {
    let speeds = stream(&[(30, 3.0), (0, 1.0), (10, 2.0), (20, 4.0)]);
    let window = speeds.window(&TimeRange::new(at(10), at(20)));
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].time, at(10));
    assert_eq!(window[1].time, at(20));

    assert_eq!(
        mean_speed_through_water(&speeds, &TimeRange::new(at(0), at(20))),
        Some(7.0 / 3.0)
    );
    assert_eq!(
        mean_speed_through_water(&speeds, &TimeRange::new(at(40), at(50))),
        None
    );
}

#[test]
fn bearing_mean_wraps_around_north() {
    let headings = stream(&[(0, 350.0), (1, 10.0), (2, 0.0)]);
    let bearing = mean_bearing(&headings, &TimeRange::new(at(0), at(2))).unwrap();
    assert!(bearing < 1e-9 || bearing > 360.0 - 1e-9, "{bearing}");

    let west = stream(&[(0, 260.0), (1, 280.0)]);
    let bearing = mean_bearing(&west, &TimeRange::new(at(0), at(1))).unwrap();
    assert!((bearing - 270.0).abs() < 1e-9);
}

#[test]
fn opposite_angles_have_no_mean() {
    let samples = [
        Sample {
            time: at(0),
            value: 90.0,
        },
        Sample {
            time: at(1),
            value: 270.0,
        },
    ];
    assert_eq!(circular_mean(&samples), None);
    assert_eq!(circular_mean(&[]), None);
}

#[test]
fn wind_mean_combines_direction_and_speed() {
    let direction = stream(&[(0, 40.0), (5, 50.0), (50, 200.0)]);
    let speed = stream(&[(0, 3.0), (5, 5.0), (50, 9.0)]);
    let (dir, spd) = mean_wind(&direction, &speed, &TimeRange::new(at(0), at(10)));
    assert!((dir.unwrap() - 45.0).abs() < 1e-9);
    assert_eq!(spd, Some(4.0));
}

#[test]
fn parses_values_with_trailing_units() {
    assert_eq!(parse_measurement("2.4"), Some(2.4));
    assert_eq!(parse_measurement(" 2.4 kn"), Some(2.4));
    assert_eq!(parse_measurement("315.0deg"), Some(315.0));
    assert_eq!(parse_measurement("-1.5e1 m/s"), Some(-15.0));
    assert_eq!(parse_measurement("n/a"), None);
    assert_eq!(parse_measurement(""), None);
}

#[test]
fn converts_speeds_to_metres_per_second() {
    let knots = stream(&[(0, 10.0)]).in_unit(SpeedUnit::Knots);
    let value = knots.window(&TimeRange::new(at(0), at(0)))[0].value;
    assert!((value - 5.144_444).abs() < 1e-6);

    let kmh = stream(&[(0, 36.0)]).in_unit(SpeedUnit::KilometresPerHour);
    assert!((kmh.window(&TimeRange::new(at(0), at(0)))[0].value - 10.0).abs() < 1e-12);
}

#[test]
fn reads_streams_from_log_messages() {
    let log = log(&[
        "2023-06-12 10:00:00,\"Speed, Water Referenced\",,,,1.9,,",
        "2023-06-12 10:00:01,\"Speed, Water Referenced\",,,,,,",
        "2023-06-12 10:00:02,\"Speed, Water Referenced\",,,,2.1 m/s,,",
        "2023-06-12 10:00:02,Wind Data,,,,,3.0,45",
    ]);

    let water =
        SensorStream::from_messages(&log.df, "Speed, Water Referenced", "Speed Water Referenced")
            .unwrap();
    assert_eq!(water.len(), 2);

    let missing = SensorStream::from_messages(&log.df, "Vessel Heading", "Heading").unwrap();
    assert!(missing.is_empty());

    let err = SensorStream::from_messages(&log.df, "Wind Data", "Wind Gust").unwrap_err();
    assert!(matches!(err, PipelineError::MissingField { .. }));
}

#[test]
fn unreadable_values_are_reported_with_their_time() {
    let log = log(&[
        "2023-06-12 10:00:00,Wind Data,,,,,3.0,45",
        "2023-06-12 10:00:05,Wind Data,,,,,gusty,50",
    ]);

    let err = SensorStream::from_messages(&log.df, "Wind Data", "Wind Speed").unwrap_err();
    assert!(matches!(err, PipelineError::InvalidValue { ref value, .. } if value == "gusty"));

    let (speeds, rejected) =
        SensorStream::from_messages_lenient(&log.df, "Wind Data", "Wind Speed").unwrap();
    assert_eq!(speeds.len(), 1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].time, at(5));
}

#[test]
fn manual_check_uses_relative_tolerance() {
    assert_eq!(
        ManualCheck::assess(Some(2.1), Some(2.0), 0.1),
        ManualCheck::Consistent
    );
    assert_eq!(
        ManualCheck::assess(Some(1.85), Some(2.0), 0.1),
        ManualCheck::Consistent
    );
    assert_eq!(
        ManualCheck::assess(Some(2.5), Some(2.0), 0.1),
        ManualCheck::Review
    );
    assert_eq!(ManualCheck::assess(None, Some(2.0), 0.1), ManualCheck::Review);
    assert_eq!(ManualCheck::assess(Some(2.0), None, 0.1), ManualCheck::Review);

    assert_eq!(ManualCheck::Consistent.as_csv(), Some("False"));
    assert_eq!(ManualCheck::Review.as_csv(), Some("True"));
    assert_eq!(ManualCheck::NoData.as_csv(), None);
    assert_eq!(ManualCheck::Error.as_csv(), Some("Error occurred"));
}
