use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::program::{last_lines, ProgramDescription};
use crate::status::record::StatusRecord;
use crate::status::time::format_duration;

/// RAxML is run with a fixed number of rapid bootstraps; the info file doesn't say how many
const NUM_BOOTSTRAPS: u32 = 1000;

const INFO_FILE: &str = "RAxML_info.raxml_output";

static BOOTSTRAP_ITERATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Bootstrap\[(\d+)\]").unwrap());
static OVERALL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Overall Time for \d+ Rapid Bootstraps (\d+(?:\.\d+)?) seconds").unwrap());

pub struct RAxML;

impl ProgramDescription for RAxML {
    fn name(&self) -> &'static str {
        "raxml"
    }

    fn files_to_zip(&self, _job_status: &StatusRecord) -> Vec<String> {
        [
            "RAxML_bestTree.raxml_output",
            "RAxML_bipartitionsBranchLabels.raxml_output",
            "RAxML_bipartitions.raxml_output",
            "RAxML_bootstrap.raxml_output",
            INFO_FILE,
        ]
        .map(String::from)
        .to_vec()
    }

    fn status_string(&self, job_dir: &Path) -> String {
        let lines = last_lines(&job_dir.join(INFO_FILE), 5);
        for line in lines.iter().rev() {
            if let Some(m) = BOOTSTRAP_ITERATION.captures(line) {
                return format!("iteration {}/{NUM_BOOTSTRAPS}", &m[1]);
            }
            if let Some(m) = OVERALL_TIME.captures(line) {
                let seconds = m[1].parse::<f64>().unwrap_or_default() as i64;
                return format!("bootstrap time {}", format_duration(seconds));
            }
        }
        String::new()
    }
}
