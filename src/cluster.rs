//! Static description of the cluster: queues, installed programs, and how to pair them
//!
//! Both tables are read-only and fixed at compile time. Paths in the program catalog are relative
//! to the programs root, which is configured at runtime (`--programs-dir`).

/// Scheduler queues and their limits
pub mod queue;

/// Installed program binaries
pub mod program;

/// Pick a program binary and a queue for a requested thread count
pub mod resolve;
