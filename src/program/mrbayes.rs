use std::path::Path;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::program::{last_lines, ProgramDescription};
use crate::request::spec::JobEntry;
use crate::status::record::StatusRecord;

const RESULT_SUFFIXES: [&str; 9] = [
    ".ckp", ".con.tre", ".parts", ".run1.p", ".run1.t", ".run2.p", ".run2.t", ".tstat", ".vstat",
];

// MCMC progress lines look like `   1000 -- (-5432.10) (-5433.98) ... -- 0:04:12`
static GENERATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+) -- ").unwrap());

pub struct MrBayes;

impl ProgramDescription for MrBayes {
    fn name(&self) -> &'static str {
        "mrbayes"
    }

    fn additional_params(&self, job: &JobEntry) -> Vec<(String, String)> {
        job.extra_str("result_prefix")
            .map(|rp| vec![("result_prefix".to_string(), rp.to_string())])
            .unwrap_or_default()
    }

    fn files_to_zip(&self, job_status: &StatusRecord) -> Vec<String> {
        match job_status.get("result_prefix") {
            Some(rp) => RESULT_SUFFIXES.iter().map(|suffix| format!("{rp}{suffix}")).collect(),
            None => {
                warn!("MrBayes job has no result_prefix, no result files to collect");
                Vec::new()
            }
        }
    }

    fn status_string(&self, job_dir: &Path) -> String {
        last_lines(&job_dir.join("stdout.out"), 5)
            .iter()
            .rev()
            .find_map(|line| GENERATION.captures(line).map(|m| format!("generation {}", &m[1])))
            .unwrap_or_default()
    }
}
