mod common;
mod nmea2000_csv;

pub use common::parse_log_time;
pub use nmea2000_csv::parse_navigation_log;
