use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::cluster::resolve::Resolution;
use crate::parallel::Parallel;
use crate::request::spec::JobEntry;
use crate::threads::NumThreads;

pub const SCRIPT_FILENAME: &str = "job_script";

/// Everything needed to render the script of one job
pub struct ScriptRequest<'a> {
    pub program_type: &'a str,
    pub job: &'a JobEntry,
    pub resolution: &'a Resolution,
    pub num_threads: NumThreads,
    pub name: Option<&'a str>,
    pub project: Option<&'a str>,
    pub email: Option<&'a str>,
    /// program specific parameters recorded by the pre-run hook
    pub params: Vec<(String, String)>,
    /// where the `isabella` binary lives on the compute nodes
    pub bin_dir: &'a Path,
    pub programs_dir: &'a Path,
    /// relay the hooks send their emails through
    pub smtp_server: &'a str,
}

/// A rendered job script, ready to be written next to the job's input files
pub struct JobScript {
    header: Header,
    environment: Environment,
    run: Run,
}

/// Rendered `#$` directives: job name, project, slots, queue, output files and mail
struct Header {
    content: String,
}

/// Rendered PATH and SMTP relay exports and environment module loads
struct Environment {
    content: String,
}

/// Rendered program invocation wrapped with the pre-run and post-run hooks
struct Run {
    content: String,
}

#[derive(Serialize)]
struct HeaderContext<'a> {
    name: Option<&'a str>,
    project: Option<&'a str>,
    slots: Option<String>,
    queue: &'a str,
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct EnvironmentContext<'a> {
    bin_dir: String,
    program_dir: String,
    smtp_server: &'a str,
    modules: &'a [&'a str],
}

#[derive(Serialize)]
struct RunContext<'a> {
    program_type: &'a str,
    params: Option<String>,
    command: String,
}

impl ScriptRequest<'_> {
    pub fn render(&self) -> Result<JobScript> {
        let command = program_command(self.job, self.resolution, self.num_threads.max())
            .with_context(|| format!("No {} command line for {}", self.resolution.program.parallel, self.program_type))?;

        Ok(JobScript {
            header: render_header(self)?,
            environment: render_environment(self)?,
            run: render_run(self, command)?,
        })
    }
}

impl JobScript {
    /// Complete script text; section order matters
    pub fn content(&self) -> String {
        [&self.header.content, &self.environment.content, &self.run.content]
            .into_iter()
            .map(String::as_str)
            .collect()
    }

    /// Write the script to `<dir>/job_script`
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SCRIPT_FILENAME);
        info!("Writing job script {}", path.display());
        fs::write(&path, self.content()).with_context(|| format!("Can't write job script {}", path.display()))?;
        Ok(path)
    }
}

/// Command line of the resolved build
///
/// The threads template is used for a threaded build, the single template otherwise. `{exe}` is
/// replaced with the executable, and the executable is prepended when the template doesn't name
/// it. `{num_threads}` becomes `$NSLOTS` only when the job really gets several slots.
pub fn program_command(job: &JobEntry, resolution: &Resolution, max_threads: u32) -> Option<String> {
    let template = match resolution.program.parallel {
        Parallel::Threads => job.threads.as_deref(),
        _ => job.single.as_deref(),
    }?;
    let num_threads = if resolution.is_threaded(max_threads) { "$NSLOTS" } else { "1" };
    let exe = resolution.program.executable;

    let cmd = template.replace("{num_threads}", num_threads);
    let cmd = if cmd.contains("{exe}") { cmd.replace("{exe}", exe) } else { format!("{exe} {cmd}") };
    Some(cmd.trim_end().to_string())
}

fn template_engine<'a>(name: &'a str, text: &'a str) -> Result<TinyTemplate<'a>> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template(name, text)?;
    Ok(tt)
}

/// Render the scheduler directives using TinyTemplate
fn render_header(request: &ScriptRequest) -> Result<Header> {
    /// included header template
    static HEADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/header.txt"));
    let tt = template_engine("header", HEADER)?;

    let max_threads = request.num_threads.max();
    let context = HeaderContext {
        name: request.name,
        project: request.project,
        slots: request.resolution.is_threaded(max_threads).then(|| request.num_threads.to_string()),
        queue: request.resolution.queue.name,
        email: request.email,
    };
    Ok(Header { content: tt.render("header", &context)? })
}

/// Render PATH, SMTP relay and module setup using TinyTemplate
fn render_environment(request: &ScriptRequest) -> Result<Environment> {
    /// included environment template
    static ENVIRONMENT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/environment.txt"));
    let tt = template_engine("environment", ENVIRONMENT)?;

    let program = request.resolution.program;
    let context = EnvironmentContext {
        bin_dir: request.bin_dir.display().to_string(),
        program_dir: program.install_dir(request.programs_dir).display().to_string(),
        smtp_server: request.smtp_server,
        modules: program.modules,
    };
    Ok(Environment { content: tt.render("environment", &context)? })
}

/// Render the hooks and program command using TinyTemplate
fn render_run(request: &ScriptRequest, command: String) -> Result<Run> {
    /// included run template
    static RUN: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/run.txt"));
    let tt = template_engine("run", RUN)?;

    let params = (!request.params.is_empty()).then(|| {
        request.params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(":")
    });
    let context = RunContext { program_type: request.program_type, params, command };
    Ok(Run { content: tt.render("run", &context)? })
}
