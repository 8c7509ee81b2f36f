//! Plain-text status files shared between the submitting process and the running jobs
//!
//! A batch of submitted jobs is described by a processing status file in the directory the jobs
//! were submitted from. Each job keeps its own job status file, created by the pre-run hook and
//! completed by the post-run hook. Both files are flat `key: value` lines.

/// `key: value` line records
pub mod record;

/// Timestamps and elapsed time formatting
pub mod time;

/// Exclusive advisory locks on status files
pub mod lock;

/// Job status file, one per submitted job
pub mod job;

/// Processing status file, one per batch
pub mod processing;
