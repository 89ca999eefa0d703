//! Conveyor Core
//!
//! Core types and abstractions for the Conveyor job-dispatch system.
//!
//! This crate contains:
//! - Domain types: jobs and runners, wrapped in versioned entities
//! - Changes: validated lifecycle transitions of those values
//! - Queries: criteria and the filter expressions repositories evaluate
//! - DTOs: Data transfer objects for inter-service communication

pub mod change;
pub mod domain;
pub mod dto;
pub mod query;
