pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod outputs;
pub mod positions;
pub mod stops;
pub mod trajectory;
pub mod transect;

pub use aggregator::{aggregate_sessions, write_aggregate_csv, AggregateError, AggregateRow};
pub use analysis::{analyze_session, SessionAnalysis, TransectSummary};
pub use config::{AnalysisConfig, ConfigError, SessionConfig, SessionManifest};
pub use error::{PipelineError, Result};
pub use outputs::write_session_outputs;
