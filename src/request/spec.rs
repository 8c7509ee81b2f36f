use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of a step's `cluster_run.json`
#[derive(Debug, Deserialize, Serialize)]
pub struct StepSpecification {
    pub program: String,
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

/// One scheduler submission declared by a step
///
/// `single` and `threads` are command line templates for the single CPU and the threaded build
/// of the program. `{exe}` and `{num_threads}` are substituted when the script is rendered.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct JobEntry {
    pub directory: Option<String>,
    pub single: Option<String>,
    pub threads: Option<String>,
    /// program specific keys, e.g. MrBayes `result_prefix`
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl JobEntry {
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}
