//! Service Module
//!
//! Business logic layer for the registry.
//! Services run lifecycle changes against the repositories.

pub mod cleaner;
pub mod job;
pub mod runner;

// Re-export for convenience
pub use job as job_service;
pub use runner as runner_service;
