//! What isabella knows about each wrapped scientific program
//!
//! A description decides which extra parameters a job records in its status file, which result
//! files are collected once the batch finishes, and how to guess progress from a running job's
//! log output.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::request::spec::JobEntry;
use crate::status::record::StatusRecord;

/// RAxML maximum likelihood tree inference
pub mod raxml;

/// MrBayes Bayesian phylogenetic inference
pub mod mrbayes;

pub trait ProgramDescription: Sync {
    fn name(&self) -> &'static str;

    /// Job specific parameters passed to the pre-run hook and stored in the job status file
    fn additional_params(&self, _job: &JobEntry) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Result files of a finished job, relative to its directory
    fn files_to_zip(&self, job_status: &StatusRecord) -> Vec<String>;

    /// Best effort progress phrase for a running job, empty when nothing is known
    fn status_string(&self, _job_dir: &Path) -> String {
        String::new()
    }
}

pub fn description_for(program_type: &str) -> Option<&'static dyn ProgramDescription> {
    match program_type {
        "raxml" => Some(&raxml::RAxML),
        "mrbayes" => Some(&mrbayes::MrBayes),
        _ => None,
    }
}

/// Up to `n` last lines of a file, newest last. Unreadable files have no lines.
pub(crate) fn last_lines(path: &Path, n: usize) -> VecDeque<String> {
    let mut lines = VecDeque::with_capacity(n);
    let Ok(file) = File::open(path) else {
        return lines;
    };
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if lines.len() == n {
            lines.pop_front();
        }
        lines.push_back(line);
    }
    lines
}
