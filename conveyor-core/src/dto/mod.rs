//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs used for communication between Conveyor services
//! (registry, runner, cli). DTOs are lightweight request shapes and paging
//! envelopes around the domain values.

pub mod job;
pub mod page;
pub mod runner;
