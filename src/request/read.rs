use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::request::spec::StepSpecification;

pub const SPEC_FILENAME: &str = "cluster_run.json";

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("no cluster_run.json in step")]
    Missing,
    #[error("can't read cluster run info: {0}")]
    ReadError(#[from] io::Error),
    #[error("cluster run info is not valid JSON")]
    JSONDecodeError,
    #[error("cluster run info is empty?!")]
    Empty,
    #[error("cluster run info doesn't have specified program to run!")]
    NoProgram,
    #[error("cluster run info fails validation")]
    JSONValidationError,
    #[error("cluster run info can't be deserialised")]
    DeserialisationError,
}

/// A step directory that may hold a `cluster_run.json`
pub struct StepFile<'a> {
    pub step_dir: PathBuf,
    pub compiled_schema: &'a JSONSchema,
}

impl StepFile<'_> {
    pub fn path(&self) -> PathBuf {
        self.step_dir.join(SPEC_FILENAME)
    }

    pub fn read(&self) -> Result<StepSpecification, SpecError> {
        let json = self.parse_untyped_json()?;

        if is_empty(&json) {
            return Err(SpecError::Empty);
        }
        if json.get("program").is_none() {
            return Err(SpecError::NoProgram);
        }
        self.validate(&json)?;
        self.parse_json(json)
    }

    fn validate(&self, json: &Value) -> Result<(), SpecError> {
        info!("Validating {} against JSON schema", self.path().display());
        self.compiled_schema.validate(json).map_err(|errors| {
            for err in errors {
                warn!("{}: {} at {}", self.path().display(), err, err.instance_path);
            }
            SpecError::JSONValidationError
        })
    }

    fn parse_untyped_json(&self) -> Result<Value, SpecError> {
        let path = self.path();
        if !path.is_file() {
            return Err(SpecError::Missing);
        }
        info!("Reading cluster run info at {}", path.display());
        let json_string = fs::read_to_string(&path)?;
        serde_json::from_str::<Value>(&json_string).map_err(|_| SpecError::JSONDecodeError)
    }

    fn parse_json(&self, value: Value) -> Result<StepSpecification, SpecError> {
        serde_json::from_value::<StepSpecification>(value).map_err(|_| SpecError::DeserialisationError)
    }
}

fn is_empty(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Every subdirectory of `dir`, sorted by name
pub fn get_step_paths(dir: &Path) -> Result<Vec<PathBuf>, io::Error> {
    let mut paths = fs::read_dir(dir)?
        .map(|res| res.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, io::Error>>()?;
    paths.retain(|p| p.is_dir());
    paths.sort();
    Ok(paths)
}
