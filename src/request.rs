//! Per-step job specifications (`cluster_run.json`)

/// Typed job specification
pub mod spec;

/// Embedded JSON schema for job specifications
pub mod schema;

/// Find step directories and read their specifications
pub mod read;
