use std::path::PathBuf;

use thiserror::Error;

/// Conditions callers may want to tell apart from ordinary I/O failures
#[derive(Debug, Error)]
pub enum IsabellaError {
    #[error("directory {0} is already in processing")]
    AlreadyProcessing(PathBuf),
    #[error("no processing found in {0} or any parent directory")]
    NotProcessing(PathBuf),
    #[error("qsub failed in {dir} with {status}")]
    SchedulerFailed { dir: PathBuf, status: std::process::ExitStatus },
}
