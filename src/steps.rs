//! Scan project steps for job specifications and submit every declared job

use std::path::{Path, PathBuf};

use anyhow::Result;
use jsonschema::JSONSchema;
use log::{info, warn};

use crate::cluster::resolve::resolve;
use crate::program::{description_for, ProgramDescription};
use crate::request::read::{get_step_paths, SpecError, StepFile};
use crate::request::schema::load_schema;
use crate::request::spec::{JobEntry, StepSpecification};
use crate::script::job::ScriptRequest;
use crate::script::submit::submit;
use crate::status::processing::{check_not_processing, write_processing_status};
use crate::threads::NumThreads;
use crate::WorkingDirectory;

/// Options shared by every job of one run
pub struct RunOptions {
    pub num_threads: NumThreads,
    /// write scripts and print them instead of submitting
    pub simulate: bool,
    pub email: Option<String>,
    pub project: Option<String>,
    pub bin_dir: PathBuf,
    pub programs_dir: PathBuf,
    /// relay exported to the hooks, which mail from the compute nodes
    pub smtp_server: String,
}

/// Submit the jobs of `step_names` (every subdirectory when empty) and record the batch
///
/// Returns the submitted job directories relative to the working directory. Steps with a missing,
/// empty or invalid specification, or with an unknown program, are skipped with a warning.
pub fn run_steps(wd: &WorkingDirectory, step_names: &[String], options: &RunOptions) -> Result<Vec<String>> {
    check_not_processing(&wd.path)?;
    let schema = load_schema()?;

    let named = !step_names.is_empty();
    let steps: Vec<PathBuf> = if named {
        step_names.iter().map(|s| wd.path.join(s)).collect()
    } else {
        get_step_paths(&wd.path)?
    };

    let mut jobs: Vec<String> = Vec::new();
    for step_dir in steps {
        let step_name = relative_name(&wd.path, &step_dir);
        let spec = match read_step(&step_dir, &schema, named) {
            Ok(Some(spec)) => spec,
            Ok(None) => continue,
            Err(problem) => {
                warn!("Step {step_name}: {problem}");
                continue;
            }
        };
        let Some(desc) = description_for(&spec.program) else {
            warn!("Step {step_name}: unknown program {}", spec.program);
            continue;
        };

        let step_path = step_dir.canonicalize()?;
        for job in &spec.jobs {
            let (job_dir, name) = job_location(&step_name, &step_path, job.directory.as_deref());
            match submit_job(wd, &job_dir, &name, desc, job, options) {
                Ok(true) => jobs.push(job_dir),
                Ok(false) => {}
                Err(err) => warn!("Job {job_dir} not submitted: {err:#}"),
            }
        }
    }

    if options.simulate {
        info!("Simulated run of {} jobs, processing status not written", jobs.len());
    } else {
        write_processing_status(&wd.path, &jobs, options.email.as_deref())?;
    }
    Ok(jobs)
}

/// Specification of one step, or the problem to warn about
///
/// Subdirectories found by scanning (`named` false) that aren't steps are skipped quietly.
fn read_step(step_dir: &Path, schema: &JSONSchema, named: bool) -> Result<Option<StepSpecification>, String> {
    if !step_dir.is_dir() {
        return if named { Err("not a directory".to_string()) } else { Ok(None) };
    }
    match (StepFile { step_dir: step_dir.to_path_buf(), compiled_schema: schema }).read() {
        Ok(spec) => Ok(Some(spec)),
        Err(SpecError::Missing) if !named => Ok(None),
        Err(err) => Err(err.to_string()),
    }
}

fn relative_name(base: &Path, dir: &Path) -> String {
    dir.strip_prefix(base)
        .unwrap_or(dir)
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string()
}

/// Job directory (relative to the working directory) and scheduler job name
///
/// With a job directory the name is `<step>-<directory>`, otherwise `<parent>-<step>`, taken from
/// the absolute step path so names are stable wherever the run is started from.
pub fn job_location(step_name: &str, step_path: &Path, directory: Option<&str>) -> (String, String) {
    let mut parts = step_path
        .components()
        .rev()
        .map(|c| c.as_os_str().to_string_lossy().into_owned());
    let last = parts.next().unwrap_or_default();

    match directory {
        Some(dir) => (format!("{step_name}/{dir}"), format!("{last}-{dir}")),
        None => {
            let name = match parts.next().filter(|p| p != "/") {
                Some(parent) => format!("{parent}-{last}"),
                None => last,
            };
            (step_name.to_string(), name)
        }
    }
}

/// Render, write and submit one job. `Ok(false)` when the job can't be run on this cluster.
fn submit_job(
    wd: &WorkingDirectory,
    job_dir: &str,
    name: &str,
    desc: &dyn ProgramDescription,
    job: &JobEntry,
    options: &RunOptions,
) -> Result<bool> {
    if job.single.is_none() && job.threads.is_none() {
        warn!("Job {job_dir}: don't know job's command line");
        return Ok(false);
    }
    let max_threads = options.num_threads.max();
    let Some(resolution) = resolve(desc.name(), max_threads, job.single.is_some(), job.threads.is_some()) else {
        warn!("Job {job_dir}: no installed {} build and queue for {max_threads} threads", desc.name());
        return Ok(false);
    };

    let request = ScriptRequest {
        program_type: desc.name(),
        job,
        resolution: &resolution,
        num_threads: options.num_threads,
        name: Some(name),
        project: options.project.as_deref(),
        email: options.email.as_deref(),
        params: desc.additional_params(job),
        bin_dir: &options.bin_dir,
        programs_dir: &options.programs_dir,
        smtp_server: &options.smtp_server,
    };
    let script = request.render()?;
    let cwd = wd.path.join(job_dir);
    script.write(&cwd)?;

    if options.simulate {
        println!("{}", cwd.display());
        println!("{}", script.content());
    } else {
        submit(&cwd)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::error::IsabellaError;
    use crate::script::job::SCRIPT_FILENAME;
    use crate::status::processing::processing_status_path;

    use super::*;

    fn options(simulate: bool) -> RunOptions {
        RunOptions {
            num_threads: NumThreads::Exact(4),
            simulate,
            email: Some("a@srce.hr".to_string()),
            project: None,
            bin_dir: PathBuf::from("/home/isabella/bin"),
            programs_dir: PathBuf::from("/home/isabella/programs"),
            smtp_server: "relay.srce.hr".to_string(),
        }
    }

    fn write_step(root: &Path, step: &str, spec: &str, job_dirs: &[&str]) {
        let dir = root.join(step);
        fs::create_dir_all(&dir).unwrap();
        for job in job_dirs {
            fs::create_dir_all(dir.join(job)).unwrap();
        }
        fs::write(dir.join("cluster_run.json"), spec).unwrap();
    }

    #[test]
    fn job_names() {
        let step = Path::new("/home/user/project/02_tree");
        assert_eq!(
            job_location("02_tree", step, Some("gene_1")),
            ("02_tree/gene_1".to_string(), "02_tree-gene_1".to_string())
        );
        assert_eq!(job_location("02_tree", step, None), ("02_tree".to_string(), "project-02_tree".to_string()));
        assert_eq!(job_location("x", Path::new("/x"), None), ("x".to_string(), "x".to_string()));
    }

    #[test]
    fn simulated_run_writes_scripts_only() {
        let tmp = TempDir::new().unwrap();
        write_step(
            tmp.path(),
            "02_tree",
            r#"{"program": "raxml", "jobs": [
                {"directory": "gene_1", "single": "-s a.phy", "threads": "-T {num_threads} -s a.phy"},
                {"directory": "gene_2", "single": "-s b.phy"}
            ]}"#,
            &["gene_1", "gene_2"],
        );
        let wd = WorkingDirectory { path: tmp.path().to_path_buf() };

        let jobs = run_steps(&wd, &[], &options(true)).unwrap();
        assert_eq!(jobs, ["02_tree/gene_1", "02_tree/gene_2"]);
        assert!(!processing_status_path(tmp.path()).exists());

        let script = fs::read_to_string(tmp.path().join("02_tree/gene_1").join(SCRIPT_FILENAME)).unwrap();
        assert!(script.contains("#$ -N 02_tree-gene_1\n"));
        assert!(script.contains("raxmlHPC-PTHREADS-AVX2 -T $NSLOTS -s a.phy"));
        assert!(script.contains("export ISABELLA_SMTP_SERVER=relay.srce.hr\n"));
        let script = fs::read_to_string(tmp.path().join("02_tree/gene_2").join(SCRIPT_FILENAME)).unwrap();
        assert!(script.contains("raxmlHPC-AVX2 -s b.phy"));
    }

    #[test]
    fn bad_steps_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write_step(tmp.path(), "01_empty", "{}", &[]);
        write_step(tmp.path(), "02_no_program", r#"{"jobs": []}"#, &[]);
        write_step(tmp.path(), "03_unknown", r#"{"program": "beast", "jobs": [{"single": "x"}]}"#, &[]);
        write_step(tmp.path(), "04_no_command", r#"{"program": "raxml", "jobs": [{}]}"#, &[]);
        write_step(tmp.path(), "05_mrbayes", r#"{"program": "mrbayes", "jobs": [{"single": "{exe} run.nex", "result_prefix": "run.nex"}]}"#, &[]);
        fs::create_dir(tmp.path().join("06_no_spec")).unwrap();
        let wd = WorkingDirectory { path: tmp.path().to_path_buf() };

        let jobs = run_steps(&wd, &[], &options(true)).unwrap();
        assert_eq!(jobs, ["05_mrbayes"]);
        let script = fs::read_to_string(tmp.path().join("05_mrbayes").join(SCRIPT_FILENAME)).unwrap();
        assert!(script.contains("isabella pre-run mrbayes \"result_prefix=run.nex\""));
    }

    #[test]
    fn only_named_steps() {
        let tmp = TempDir::new().unwrap();
        let spec = r#"{"program": "raxml", "jobs": [{"single": "-s a.phy"}]}"#;
        write_step(tmp.path(), "01_a", spec, &[]);
        write_step(tmp.path(), "02_b", spec, &[]);
        let wd = WorkingDirectory { path: tmp.path().to_path_buf() };

        let jobs = run_steps(&wd, &["02_b".to_string(), "missing".to_string()], &options(true)).unwrap();
        assert_eq!(jobs, ["02_b"]);
    }

    #[test]
    fn missing_named_steps_are_reported() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("01_no_spec")).unwrap();
        let schema = load_schema().unwrap();

        let err = read_step(&tmp.path().join("01_no_spec"), &schema, true).unwrap_err();
        assert_eq!(err, "no cluster_run.json in step");
        assert_eq!(read_step(&tmp.path().join("missing"), &schema, true).unwrap_err(), "not a directory");

        assert!(read_step(&tmp.path().join("01_no_spec"), &schema, false).unwrap().is_none());
        assert!(read_step(&tmp.path().join("missing"), &schema, false).unwrap().is_none());
    }

    #[test]
    fn refuses_second_batch() {
        let tmp = TempDir::new().unwrap();
        write_processing_status(tmp.path(), &["a".to_string()], None).unwrap();
        let wd = WorkingDirectory { path: tmp.path().to_path_buf() };

        let err = run_steps(&wd, &[], &options(true)).unwrap_err();
        assert!(matches!(err.downcast_ref::<IsabellaError>(), Some(IsabellaError::AlreadyProcessing(_))));
    }
}
