use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::error::IsabellaError;
use crate::script::job::SCRIPT_FILENAME;

const QSUB: &str = "qsub";

#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// qsub accepted the script and printed this
    Submitted(String),
    /// qsub isn't installed here, the command was printed for the user to run
    Manual,
}

/// Submit `<dir>/job_script` with qsub from inside `dir`
pub fn submit(dir: &Path) -> Result<Submission> {
    submit_with(QSUB, dir)
}

fn submit_with(qsub: &str, dir: &Path) -> Result<Submission> {
    let mut command = Command::new(qsub);
    let cmd = command.arg(SCRIPT_FILENAME).current_dir(dir);
    info!("Running qsub process");
    info!("{:?}", &cmd);

    match cmd.output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            info!("{stdout}");
            Ok(Submission::Submitted(stdout))
        }
        Ok(output) => {
            warn!("{}", String::from_utf8_lossy(&output.stderr).trim());
            Err(IsabellaError::SchedulerFailed { dir: dir.to_path_buf(), status: output.status }.into())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("{qsub} not found, submit the job manually");
            println!("cd {}; {qsub} {SCRIPT_FILENAME}", dir.display());
            Ok(Submission::Manual)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to execute {qsub} in {}", dir.display())),
    }
}
