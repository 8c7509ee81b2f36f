use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::IsabellaError;
use crate::notify::{Notifier, SUBJECT};
use crate::program::description_for;
use crate::status::job::{has_status, is_ended, read_job_status, JOB_FILENAME};
use crate::status::lock::LockedFile;
use crate::status::record::StatusRecord;
use crate::status::time::{format_duration, now_timestamp, seconds_between};

pub const PROCESSING_FILENAME: &str = "processing.status";
pub const OUTPUT_FILENAME: &str = "processing_output.zip";

const JOB_DIR_PREFIX: &str = "job_dir_";
const MAIL_SEND: &str = "mail_send";

pub fn processing_status_path(dir: &Path) -> PathBuf {
    dir.join(PROCESSING_FILENAME)
}

/// Refuse to submit a second batch from the same directory
pub fn check_not_processing(dir: &Path) -> Result<(), IsabellaError> {
    if processing_status_path(dir).is_file() {
        Err(IsabellaError::AlreadyProcessing(dir.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Create the processing status file for a freshly submitted batch
///
/// Job directories are relative to `dir`. After this only the `mail_send` flag is ever added.
pub fn write_processing_status(dir: &Path, job_dirs: &[String], email: Option<&str>) -> io::Result<()> {
    let mut record = StatusRecord::default();
    for (i, job_dir) in job_dirs.iter().enumerate() {
        record.push(format!("{JOB_DIR_PREFIX}{i}"), job_dir.as_str());
    }
    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        record.push("email", email);
    }
    let path = processing_status_path(dir);
    info!("Writing processing status {} with {} jobs", path.display(), job_dirs.len());
    fs::write(path, record.to_string())
}

/// A batch of jobs submitted together, loaded from its processing status file
#[derive(Debug)]
pub struct Processing {
    pub directory: PathBuf,
    pub data: StatusRecord,
}

impl Processing {
    /// Find the batch `start` belongs to by checking `start` and then every parent directory
    pub fn find(start: &Path) -> Result<Option<Processing>> {
        let start = start
            .canonicalize()
            .with_context(|| format!("Can't resolve {}", start.display()))?;
        for dir in start.ancestors() {
            let path = processing_status_path(dir);
            if path.is_file() {
                info!("Found processing status {}", path.display());
                let data = StatusRecord::read(&path)?;
                return Ok(Some(Processing { directory: dir.to_path_buf(), data }));
            }
        }
        Ok(None)
    }

    /// Like `find`, but a missing batch is an error
    pub fn require(start: &Path) -> Result<Processing> {
        Processing::find(start)?.ok_or_else(|| IsabellaError::NotProcessing(start.to_path_buf()).into())
    }

    pub fn status_path(&self) -> PathBuf {
        processing_status_path(&self.directory)
    }

    /// Job directories relative to the processing directory, in submission order
    pub fn job_directories(&self) -> impl Iterator<Item = &str> {
        self.data.with_prefix(JOB_DIR_PREFIX).map(|(_, v)| v)
    }

    pub fn job_path(&self, job_dir: &str) -> PathBuf {
        self.directory.join(job_dir)
    }

    pub fn email(&self) -> Option<&str> {
        self.data.get("email").filter(|e| !e.is_empty())
    }

    /// Exclusive lock on the processing status file
    pub fn lock(&self) -> Result<LockedFile> {
        LockedFile::open(&self.status_path())
    }

    /// Every job's status file exists and has an `ended:` line
    pub fn is_finished(&self) -> bool {
        self.job_directories().all(|d| is_ended(&self.job_path(d)))
    }

    /// One line per job with elapsed time and, where known, progress
    pub fn report(&self) -> Vec<String> {
        self.report_at(&now_timestamp())
    }

    pub fn report_at(&self, now: &str) -> Vec<String> {
        self.job_directories().map(|d| self.job_report(d, now)).collect()
    }

    fn job_report(&self, job_dir: &str, now: &str) -> String {
        let path = self.job_path(job_dir);
        let Ok(status) = read_job_status(&path) else {
            return format!("{job_dir}: waiting");
        };
        let ended = status.get("ended");
        let lasted = status
            .get("started")
            .and_then(|started| seconds_between(started, ended.unwrap_or(now)))
            .map(format_duration)
            .unwrap_or_else(|| "?".to_string());

        let progress = match ended {
            Some(_) => "finished".to_string(),
            None => status
                .get("program_type")
                .and_then(description_for)
                .map(|desc| desc.status_string(&path))
                .unwrap_or_default(),
        };
        if progress.is_empty() {
            format!("{job_dir}: {lasted}")
        } else {
            format!("{job_dir}: {lasted} - {progress}")
        }
    }

    /// Archive entries, relative to the processing directory
    ///
    /// For each job the program's declared result files followed by the job status file.
    pub fn files_to_collect(&self) -> Vec<String> {
        let mut files = Vec::new();
        for job_dir in self.job_directories() {
            let status = read_job_status(&self.job_path(job_dir)).unwrap_or_else(|err| {
                warn!("Can't read job status in {job_dir}: {err}");
                StatusRecord::default()
            });
            if let Some(desc) = status.get("program_type").and_then(description_for) {
                files.extend(desc.files_to_zip(&status).into_iter().map(|f| format!("{job_dir}/{f}")));
            }
            files.push(format!("{job_dir}/{JOB_FILENAME}"));
        }
        files
    }

    /// Zip every job's results into the processing directory
    pub fn collect_output(&self) -> Result<PathBuf> {
        let out_path = self.directory.join(OUTPUT_FILENAME);
        info!("Collecting output to {}", out_path.display());
        let mut zip = ZipWriter::new(File::create(&out_path)?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for name in self.files_to_collect() {
            let path = self.directory.join(&name);
            if !path.is_file() {
                warn!("Result file {} is missing, not collected", path.display());
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            let mut file = File::open(&path)?;
            io::copy(&mut file, &mut zip)?;
        }
        zip.finish()?;
        Ok(out_path)
    }

    /// Tell the batch owner that the first job started
    ///
    /// Sent at most once per batch: the `mail_send` flag is checked and written while holding the
    /// exclusive lock. If the lock can't be taken the email is not sent.
    pub fn send_start_email(&self, notifier: &dyn Notifier) -> Result<bool> {
        if self.data.contains_key(MAIL_SEND) {
            return Ok(false);
        }
        let Some(email) = self.email() else {
            return Ok(false);
        };
        if self.job_directories().any(|d| has_status(&self.job_path(d))) {
            return Ok(false);
        }

        match self.claim_start_email() {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(err) => {
                error!("Can't lock {}, start email not sent: {err:#}", self.status_path().display());
                return Ok(false);
            }
        }

        let text = format!("The first job of the processing in directory {} has started.", self.directory.display());
        notifier.send(email, SUBJECT, &text)?;
        Ok(true)
    }

    fn claim_start_email(&self) -> Result<bool> {
        let mut locked = self.lock()?;
        let current = StatusRecord::parse(&locked.read_to_string()?);
        if current.contains_key(MAIL_SEND) {
            info!("Start email already sent for {}", self.directory.display());
            return Ok(false);
        }
        locked.append_line(&format!("{MAIL_SEND}: 1"))?;
        Ok(true)
    }

    pub fn send_finish_email(&self, notifier: &dyn Notifier) -> Result<bool> {
        let Some(email) = self.email() else {
            return Ok(false);
        };
        let text = format!("The processing in directory {} has finished.", self.directory.display());
        notifier.send(email, SUBJECT, &text)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;
    use zip::ZipArchive;

    use crate::notify::tests::RecordingNotifier;
    use crate::status::job::{append_ended, started_record, write_started};

    use super::*;

    const STARTED: &str = "2024-03-01 10:00:00.000000";

    /// A batch of two jobs in `step/a` and `step/b`
    fn batch(email: Option<&str>) -> (TempDir, Processing) {
        let tmp = TempDir::new().unwrap();
        let jobs = vec!["step/a".to_string(), "step/b".to_string()];
        for job in &jobs {
            fs::create_dir_all(tmp.path().join(job)).unwrap();
        }
        write_processing_status(tmp.path(), &jobs, email).unwrap();
        let processing = Processing::find(&tmp.path().join("step/a")).unwrap().unwrap();
        (tmp, processing)
    }

    fn start(processing: &Processing, job_dir: &str, program_type: &str, params: &[(String, String)]) {
        let record = started_record(program_type, params, STARTED, &[]);
        write_started(&processing.job_path(job_dir), &record).unwrap();
    }

    #[test]
    fn already_processing() {
        let (tmp, _) = batch(None);
        let err = check_not_processing(tmp.path()).unwrap_err();
        assert!(matches!(err, IsabellaError::AlreadyProcessing(_)));
        assert!(check_not_processing(&tmp.path().join("step")).is_ok());
    }

    #[test]
    fn found_from_nested_directory() {
        let (tmp, processing) = batch(Some("a@srce.hr"));
        assert_eq!(processing.directory, tmp.path().canonicalize().unwrap());
        assert_eq!(processing.job_directories().collect::<Vec<_>>(), ["step/a", "step/b"]);
        assert_eq!(processing.email(), Some("a@srce.hr"));
    }

    #[test]
    fn not_found_outside_batch() {
        let tmp = TempDir::new().unwrap();
        assert!(Processing::find(tmp.path()).unwrap().is_none());
        assert!(Processing::require(tmp.path()).is_err());
    }

    #[test]
    fn finished_only_when_every_job_ended() {
        let (_tmp, processing) = batch(None);
        assert!(!processing.is_finished());

        start(&processing, "step/a", "raxml", &[]);
        append_ended(&processing.job_path("step/a"), STARTED).unwrap();
        // step/b has no status file yet
        assert!(!processing.is_finished());

        start(&processing, "step/b", "raxml", &[]);
        assert!(!processing.is_finished());

        append_ended(&processing.job_path("step/b"), STARTED).unwrap();
        assert!(processing.is_finished());
    }

    #[test]
    fn report_lines() {
        let (_tmp, processing) = batch(None);
        start(&processing, "step/a", "raxml", &[]);
        append_ended(&processing.job_path("step/a"), "2024-03-01 11:02:05.000000").unwrap();

        let report = processing.report_at("2024-03-01 10:01:05.000000");
        assert_eq!(report, ["step/a:  1h:02m - finished", "step/b: waiting"]);

        start(&processing, "step/b", "raxml", &[]);
        fs::write(processing.job_path("step/b").join("RAxML_info.raxml_output"), "Bootstrap[7]: Time 1.0 seconds\n").unwrap();
        let report = processing.report_at("2024-03-01 10:01:05.000000");
        assert_eq!(report[1], "step/b: 01m:05s - iteration 7/1000");
    }

    #[test]
    fn archive_holds_declared_results_and_status() {
        let (tmp, processing) = batch(None);
        start(&processing, "step/a", "raxml", &[]);
        start(&processing, "step/b", "mrbayes", &[("result_prefix".to_string(), "run".to_string())]);

        let expected = processing.files_to_collect();
        assert_eq!(expected.len(), 5 + 1 + 9 + 1);
        for name in expected.iter().filter(|n| !n.ends_with(JOB_FILENAME)) {
            fs::write(tmp.path().join(name), name).unwrap();
        }
        fs::write(tmp.path().join("step/a/stdout.out"), "not declared").unwrap();

        let out = processing.collect_output().unwrap();
        let mut archive = ZipArchive::new(File::open(out).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(String::from).collect();
        names.sort();
        let mut expected_sorted = expected.clone();
        expected_sorted.sort();
        assert_eq!(names, expected_sorted);

        let mut content = String::new();
        archive.by_name("step/b/run.tstat").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "step/b/run.tstat");
    }

    #[test]
    fn start_email_once() {
        let (tmp, processing) = batch(Some("a@srce.hr,b@pmf.hr"));
        let notifier = RecordingNotifier::default();

        assert!(processing.send_start_email(&notifier).unwrap());
        let reloaded = Processing::find(tmp.path()).unwrap().unwrap();
        assert_eq!(reloaded.data.get("mail_send"), Some("1"));
        assert!(!reloaded.send_start_email(&notifier).unwrap());
        // a stale in-memory copy still sees the flag under the lock
        assert!(!processing.send_start_email(&notifier).unwrap());
        assert_eq!(notifier.count(), 1);
        assert_eq!(notifier.sent.lock().unwrap()[0].0, "a@srce.hr,b@pmf.hr");
    }

    #[test]
    fn start_email_once_under_concurrent_jobs() {
        let (tmp, _) = batch(Some("a@srce.hr"));
        let notifier = Arc::new(RecordingNotifier::default());
        let dir = tmp.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let notifier = Arc::clone(&notifier);
                let dir = dir.clone();
                thread::spawn(move || {
                    let processing = Processing::find(&dir).unwrap().unwrap();
                    processing.send_start_email(&*notifier).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(notifier.count(), 1);
    }

    #[test]
    fn no_start_email_without_address_or_after_first_job() {
        let notifier = RecordingNotifier::default();
        let (_tmp, processing) = batch(None);
        assert!(!processing.send_start_email(&notifier).unwrap());

        let (_tmp, processing) = batch(Some("a@srce.hr"));
        start(&processing, "step/a", "raxml", &[]);
        assert!(!processing.send_start_email(&notifier).unwrap());
        assert_eq!(notifier.count(), 0);
    }
}
