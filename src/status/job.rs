use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::status::record::StatusRecord;

pub const JOB_FILENAME: &str = "job.status";

/// Scheduler environment recorded when a job starts
pub const CAPTURED_ENV: [&str; 10] = [
    "JOB_ID", "QUEUE", "HOSTNAME", "JOB_NAME", "NSLOTS",
    "SGE_TASK_ID", "SGE_O_HOST", "SGE_O_PATH", "SGE_O_WORKDIR", "PE_HOSTFILE",
];

pub fn job_status_path(job_dir: &Path) -> PathBuf {
    job_dir.join(JOB_FILENAME)
}

/// Values of `CAPTURED_ENV` in this process, empty when unset
pub fn capture_environment() -> Vec<(String, String)> {
    CAPTURED_ENV
        .iter()
        .map(|name| (name.to_string(), env::var(name).unwrap_or_default()))
        .collect()
}

/// Contents of a freshly started job's status file
pub fn started_record(
    program_type: &str,
    params: &[(String, String)],
    started: &str,
    environment: &[(String, String)],
) -> StatusRecord {
    let mut record = StatusRecord::default();
    record.push("program_type", program_type);
    for (k, v) in params {
        record.push(k.as_str(), v.as_str());
    }
    record.push("started", started);
    for (k, v) in environment {
        record.push(k.as_str(), v.as_str());
    }
    record
}

/// Create (or truncate) the job status file
pub fn write_started(job_dir: &Path, record: &StatusRecord) -> io::Result<()> {
    let path = job_status_path(job_dir);
    info!("Writing job status {}", path.display());
    fs::write(path, record.to_string())
}

/// Append the `ended:` line that marks the job as complete
pub fn append_ended(job_dir: &Path, ended: &str) -> io::Result<()> {
    let path = job_status_path(job_dir);
    info!("Marking {} as ended", path.display());
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "ended: {ended}")
}

pub fn read_job_status(job_dir: &Path) -> io::Result<StatusRecord> {
    StatusRecord::read(&job_status_path(job_dir))
}

pub fn has_status(job_dir: &Path) -> bool {
    job_status_path(job_dir).is_file()
}

/// A job has ended iff its status file exists and has an `ended:` line
pub fn is_ended(job_dir: &Path) -> bool {
    let Ok(file) = fs::File::open(job_status_path(job_dir)) else {
        return false;
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .any(|line| line.starts_with("ended:"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![("result_prefix".to_string(), "run".to_string())]
    }

    #[test]
    fn started_record_layout() {
        let env = vec![("JOB_ID".to_string(), "42".to_string()), ("NSLOTS".to_string(), String::new())];
        let record = started_record("mrbayes", &params(), "2024-03-01 10:00:00.000000", &env);
        assert_eq!(
            record.to_string(),
            "program_type: mrbayes\nresult_prefix: run\nstarted: 2024-03-01 10:00:00.000000\nJOB_ID: 42\nNSLOTS: \n"
        );
    }

    #[test]
    fn captures_every_variable() {
        let env = capture_environment();
        let names: Vec<_> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, CAPTURED_ENV);
    }

    #[test]
    fn ended_only_after_post_run() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_ended(tmp.path()));

        let record = started_record("raxml", &[], "2024-03-01 10:00:00.000000", &[]);
        write_started(tmp.path(), &record).unwrap();
        assert!(has_status(tmp.path()));
        assert!(!is_ended(tmp.path()));

        append_ended(tmp.path(), "2024-03-01 11:00:00.000000").unwrap();
        assert!(is_ended(tmp.path()));

        let status = read_job_status(tmp.path()).unwrap();
        assert_eq!(status.get("program_type"), Some("raxml"));
        assert_eq!(status.get("ended"), Some("2024-03-01 11:00:00.000000"));
    }
}
