//! Queries over jobs and runners
//!
//! A query is an ordered list of criteria that AND together. Repositories turn
//! them into [`Filter`] expressions.

pub mod filter;
pub mod job;
pub mod runner;

pub use filter::{Document, FieldValue, Filter, IntoFilter};
pub use job::{JobCriteria, JobQuery};
pub use runner::{RunnerCriteria, RunnerQuery};
