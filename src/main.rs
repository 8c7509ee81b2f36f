use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use isabella::hooks::{post_run, pre_run};
use isabella::notify::SmtpNotifier;
use isabella::status::processing::Processing;
use isabella::steps::{run_steps, RunOptions};
use isabella::threads::NumThreads;
use isabella::WorkingDirectory;

/// Run zcitools project steps on the Isabella cluster
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SMTP relay used for start and finish notices
    #[arg(long, env = "ISABELLA_SMTP_SERVER", default_value = "localhost", global = true)]
    smtp_server: String,
    /// Root directory of installed programs
    #[arg(long, env = "ISABELLA_PROGRAMS_DIR", default_value = "/home/isabella/programs", global = true)]
    programs_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit the jobs of project steps
    Run {
        /// Project step directories to run. If not set, all subdirectories are checked.
        step_names: Vec<String>,
        /// Directory containing the project steps
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
        /// Number of threads. Can be specified as an integer (8), or a range (4-8)
        #[arg(short = 't', long, default_value = "1")]
        num_threads: NumThreads,
        /// Simulate run, without actual running
        #[arg(short = 'S', long)]
        simulate: bool,
        /// Email address(es) for start/end notices, comma separated
        #[arg(short = 'm', long)]
        email: Option<String>,
        /// Scheduler project to account the jobs to
        #[arg(short = 'P', long)]
        project: Option<String>,
    },
    /// Record a job start (called from job scripts)
    PreRun {
        program_type: String,
        /// key=value pairs separated by ':'
        params: Option<String>,
    },
    /// Record a job end (called from job scripts)
    PostRun,
    /// Print the progress of every job in the processing
    Status {
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
    /// Zip the results of the processing
    Collect {
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
}

fn main() -> Result<()> {
    // warnings about skipped steps and jobs are shown unless RUST_LOG says otherwise
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let notifier = SmtpNotifier { server: args.smtp_server.clone() };
    let cwd = env::current_dir()?;

    match args.command {
        Commands::Run { step_names, directory, num_threads, simulate, email, project } => {
            let bin_dir = env::current_exe()?
                .parent()
                .context("isabella binary has no parent directory")?
                .to_path_buf();
            let options = RunOptions {
                num_threads,
                simulate,
                email,
                project,
                bin_dir,
                programs_dir: args.programs_dir,
                smtp_server: args.smtp_server,
            };
            let wd = WorkingDirectory { path: directory };
            let jobs = run_steps(&wd, &step_names, &options)?;
            info!("{} jobs submitted", jobs.len());
        }
        Commands::PreRun { program_type, params } => {
            pre_run(&cwd, &program_type, params.as_deref(), &notifier)?;
        }
        Commands::PostRun => {
            post_run(&cwd, &notifier)?;
        }
        Commands::Status { directory } => {
            let processing = Processing::require(&directory)?;
            for line in processing.report() {
                println!("{line}");
            }
        }
        Commands::Collect { directory } => {
            let processing = Processing::require(&directory)?;
            let out = processing.collect_output()?;
            println!("{}", out.display());
        }
    }
    Ok(())
}
