//! Core domain types
//!
//! This module contains the core domain structures used across Conveyor services.
//! These types represent the fundamental business entities and are shared between
//! registry (for persistence) and runner (for execution).

pub mod entity;
pub mod job;
pub mod runner;
