//! Configuration module
//!
//! Handles CLI configuration: where the registry lives and how results are
//! printed.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the registry service
    pub registry_url: String,

    /// Print raw JSON instead of formatted text
    pub json: bool,
}
