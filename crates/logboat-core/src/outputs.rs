use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::{CsvWriter, SerWriter};
use serde_json::json;
use tracing::info;

use crate::analysis::SessionAnalysis;
use crate::error::Result;

pub const TRANSECTS_FILE: &str = "trajectories.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Files written for one analyzed session.
#[derive(Debug, Clone)]
pub struct SessionOutputs {
    pub transects_csv: PathBuf,
    pub summary_json: PathBuf,
}

/// Writes the transect table and the run summary into `dir`, creating it if needed.
pub fn write_session_outputs(dir: &Path, analysis: &SessionAnalysis) -> Result<SessionOutputs> {
    fs::create_dir_all(dir)?;
    let outputs = SessionOutputs {
        transects_csv: write_transects_csv(dir, analysis)?,
        summary_json: write_session_summary(dir, analysis)?,
    };
    info!(
        session = %analysis.session,
        dir = %dir.display(),
        transects = analysis.transects.len(),
        "Wrote session outputs"
    );
    Ok(outputs)
}

pub fn write_transects_csv(dir: &Path, analysis: &SessionAnalysis) -> Result<PathBuf> {
    let path = dir.join(TRANSECTS_FILE);
    let mut df = analysis.to_dataframe()?;
    let mut file = File::create(&path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(path)
}

pub fn write_session_summary(dir: &Path, analysis: &SessionAnalysis) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    let summary = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "session": analysis.session,
        "log_hash": analysis.file_hash,
        "window": analysis.window,
        "skipped_log_rows": analysis.skipped_rows,
        "fix_count": analysis.fix_count,
        "transect_count": analysis.transects.len(),
        "splitter": analysis.splitter,
    });
    fs::write(&path, serde_json::to_vec_pretty(&summary)?)?;
    Ok(path)
}
