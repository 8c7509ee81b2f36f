//! Render job scripts for the grid engine scheduler and submit them

/// Read the embedded templates and render them for one job
pub mod job;

/// Hand a rendered script to qsub
pub mod submit;
