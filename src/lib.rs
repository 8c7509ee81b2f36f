//! Submit phylogenetics jobs to the Isabella cluster and keep track of them
//!
//! `isabella run` turns per-step `cluster_run.json` specifications into grid engine job scripts
//! and submits them. The scripts call back into `isabella pre-run` and `isabella post-run`, which
//! record job progress in plain-text status files, email the batch owner, and archive the results
//! once every job of the batch has ended.

use std::path::PathBuf;

pub mod cluster;
pub mod error;
pub mod hooks;
pub mod notify;
pub mod parallel;
pub mod program;
/// Read and validate job specifications
pub mod request;
pub mod script;
pub mod status;
pub mod steps;
pub mod threads;

/// Directory a command operates in
pub struct WorkingDirectory {
    pub path: PathBuf,
}
