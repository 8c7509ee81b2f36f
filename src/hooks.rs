//! Pre-run and post-run hooks, called from inside every generated job script
//!
//! Both run in the job's directory on a compute node. Many jobs of the same batch may run them at
//! the same time; the shared processing status file is only touched under its exclusive lock.

use std::path::Path;

use anyhow::Result;
use log::{error, info, warn};

use crate::notify::Notifier;
use crate::status::job::{append_ended, capture_environment, started_record, write_started};
use crate::status::processing::Processing;
use crate::status::time::now_timestamp;

/// Parse `key=value:key=value` hook parameters. Entries without `=` are ignored.
pub fn parse_params(arg: &str) -> Vec<(String, String)> {
    arg.split(':')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((k, v)) => Some((k.trim().to_string(), v.trim().to_string())),
            None => {
                warn!("Ignoring parameter without a value: {entry}");
                None
            }
        })
        .collect()
}

/// Record the job start
///
/// The start email is tried before this job's status file exists, so only the first job of a
/// batch can trigger it.
pub fn pre_run(job_dir: &Path, program_type: &str, params: Option<&str>, notifier: &dyn Notifier) -> Result<()> {
    match Processing::find(job_dir)? {
        Some(processing) => {
            if let Err(err) = processing.send_start_email(notifier) {
                error!("Can't send start email: {err:#}");
            }
        }
        None => info!("{} is not part of a processing", job_dir.display()),
    }

    let params = params.map(parse_params).unwrap_or_default();
    let record = started_record(program_type, &params, &now_timestamp(), &capture_environment());
    write_started(job_dir, &record)?;
    Ok(())
}

/// Record the job end, and finish the batch if this was its last running job
///
/// Returns whether this call finished the batch.
pub fn post_run(job_dir: &Path, notifier: &dyn Notifier) -> Result<bool> {
    let ended = now_timestamp();
    match Processing::find(job_dir)? {
        Some(processing) => end_in_batch(&processing, job_dir, &ended, notifier),
        None => {
            append_ended(job_dir, &ended)?;
            Ok(false)
        }
    }
}

/// The `ended:` line is written and the completion check made while holding the batch lock, so
/// exactly one job sees the batch finished. That job collects the outputs and sends the finish
/// email.
fn end_in_batch(processing: &Processing, job_dir: &Path, ended: &str, notifier: &dyn Notifier) -> Result<bool> {
    let finished = match processing.lock() {
        Ok(_lock) => {
            append_ended(job_dir, ended)?;
            processing.is_finished()
        }
        Err(err) => {
            error!("Can't lock {}: {err:#}", processing.status_path().display());
            append_ended(job_dir, ended)?;
            if processing.is_finished() {
                error!(
                    "Every job in {} may have ended; run `isabella collect` there and notify the owner by hand",
                    processing.directory.display()
                );
            }
            false
        }
    };
    if !finished {
        return Ok(false);
    }

    info!("Processing in {} finished", processing.directory.display());
    if let Err(err) = processing.collect_output() {
        error!("Can't collect output: {err:#}");
    }
    if let Err(err) = processing.send_finish_email(notifier) {
        error!("Can't send finish email: {err:#}");
    }
    Ok(true)
}
