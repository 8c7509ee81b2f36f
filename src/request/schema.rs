use anyhow::{anyhow, Result};
use jsonschema::JSONSchema;
use serde_json::Value;

/// Compile the embedded `cluster_run.json` schema
///
/// The schema has no external references, so no resolver is configured.
pub fn load_schema() -> Result<JSONSchema> {
    /// included job specification schema
    static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/cluster_run.json"));
    let json: Value = serde_json::from_str(SCHEMA)?;
    JSONSchema::options()
        .compile(&json)
        .map_err(|err| anyhow!("Invalid cluster run schema: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_minimal_spec() {
        let schema = load_schema().unwrap();
        assert!(schema.is_valid(&json!({"program": "raxml", "jobs": []})));
    }

    #[test]
    fn rejects_wrong_types() {
        let schema = load_schema().unwrap();
        assert!(!schema.is_valid(&json!({"program": "raxml"})));
        assert!(!schema.is_valid(&json!({"program": 3, "jobs": []})));
        assert!(!schema.is_valid(&json!({"program": "raxml", "jobs": [{"single": 1}]})));
    }
}
