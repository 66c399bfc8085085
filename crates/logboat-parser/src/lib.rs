pub mod coordinates;
pub mod errors;
pub mod formats;
pub mod model;

pub use coordinates::{parse_coordinate, Hemisphere};
pub use errors::{CoordinateError, ParserError};
pub use formats::{parse_log_time, parse_navigation_log};
pub use model::{
    drop_sparse_columns, select_message_rows, select_messages, LogLayout, NavigationLog,
    MESSAGE_COLUMN, TIMESTAMP_COLUMN,
};
