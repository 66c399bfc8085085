mod support;

use logboat_core::config::{MessageConfig, PositionFilter};
use logboat_core::positions::extract_positions;
use logboat_core::PipelineError;
use logboat_parser::{parse_navigation_log, LogLayout, NavigationLog};

use support::{at, HEADER};

fn log(rows: &[&str]) -> NavigationLog {
    let mut content = vec![HEADER];
    content.extend_from_slice(rows);
    parse_navigation_log(content.join("\n").as_bytes(), &LogLayout::default()).unwrap()
}

#[test]
fn converts_positions_in_time_order() {
    let log = log(&[
        "2023-06-12 10:00:02,\"Position, Rapid Update\",48°36.0000' N,004°12.0000' W,,,,",
        "2023-06-12 10:00:00,\"Position, Rapid Update\",48°30.0000' N,004°06.0000' W,,,,",
        "2023-06-12 10:00:01,Vessel Heading,,,90.0,,,",
    ]);
    let fixes =
        extract_positions(&log.df, &MessageConfig::default(), &PositionFilter::default()).unwrap();

    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[0].time, at(0));
    assert!((fixes[0].latitude - 48.5).abs() < 1e-12);
    assert!((fixes[0].longitude + 4.1).abs() < 1e-12);
    assert!((fixes[1].latitude - 48.6).abs() < 1e-12);
}

#[test]
fn skips_gaps_unreadable_rows_and_filtered_rows() {
    let log = log(&[
        "2023-06-12 10:00:00,\"Position, Rapid Update\",48°36.0000' N,004°12.0000' W,,,,",
        "2023-06-12 10:00:01,\"Position, Rapid Update\",,004°12.0000' W,,,,",
        "2023-06-12 10:00:02,\"Position, Rapid Update\",48°36.0000' X,004°12.0000' W,,,,",
        "2023-06-12 10:00:03,\"Position, Rapid Update\",47°59.0000' N,004°12.0000' W,,,,",
        "2023-06-12 10:00:04,\"Position, Rapid Update\",48°36.0000' N,004°12.0000' E,,,,",
    ]);
    let filter = PositionFilter::new(Some("47°"), Some("W")).unwrap();
    let fixes = extract_positions(&log.df, &MessageConfig::default(), &filter).unwrap();

    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].time, at(0));
}

#[test]
fn clip_filters_match_character_classes() {
    let log = log(&[
        "2023-06-12 10:00:00,\"Position, Rapid Update\",48°36.0000' N,004°12.0000' W,,,,",
        "2023-06-12 10:00:01,\"Position, Rapid Update\",47°59.0000' N,004°12.0000' W,,,,",
        "2023-06-12 10:00:02,\"Position, Rapid Update\",48°36.0000' N,002°12.0000' W,,,,",
    ]);
    let filter = PositionFilter::new(Some("4[7]°"), Some("00[34]°")).unwrap();
    let fixes = extract_positions(&log.df, &MessageConfig::default(), &filter).unwrap();

    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].time, at(0));
}

#[test]
fn missing_coordinate_column_is_an_error() {
    let log = log(&[
        "2023-06-12 10:00:00,\"Position, Rapid Update\",48°36.0000' N,004°12.0000' W,,,,",
    ]);
    let messages = MessageConfig {
        latitude_field: "Lat".to_string(),
        ..MessageConfig::default()
    };
    assert!(matches!(
        extract_positions(&log.df, &messages, &PositionFilter::default()),
        Err(PipelineError::MissingField { ref field, .. }) if field == "Lat"
    ));
}

#[test]
fn log_without_positions_yields_no_fixes() {
    let log = log(&["2023-06-12 10:00:00,Vessel Heading,,,90.0,,,"]);
    let fixes =
        extract_positions(&log.df, &MessageConfig::default(), &PositionFilter::default()).unwrap();
    assert!(fixes.is_empty());
}
