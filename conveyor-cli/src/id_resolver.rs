//! ID resolver module
//!
//! Handles resolution of id prefixes to full ids by querying the registry.
//! This allows users to specify short, unambiguous prefixes instead of full
//! ids.

use anyhow::{Context, Result, anyhow};
use conveyor_client::RegistryClient;
use conveyor_core::dto::job::JobFilterParams;
use conveyor_core::dto::runner::RunnerFilterParams;

use crate::types::IdOrPrefix;

/// How many entities are scanned when resolving a prefix
const RESOLUTION_WINDOW: usize = 1000;

/// Resolve a job ID or prefix to a full ID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches jobs and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(client: &RegistryClient, id_or_prefix: &IdOrPrefix) -> Result<String> {
    let prefix = match id_or_prefix {
        IdOrPrefix::Full(uuid) => return Ok(uuid.to_string()),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let jobs = client
        .list_jobs(&JobFilterParams::default(), 0, RESOLUTION_WINDOW - 1)
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    unique_match("job", prefix, jobs.items.iter().map(|j| j.id.as_str()))
}

/// Resolve a runner ID or prefix to a full ID
///
/// Same rules as [`resolve_job_id`], over registered runners.
pub async fn resolve_runner_id(
    client: &RegistryClient,
    id_or_prefix: &IdOrPrefix,
) -> Result<String> {
    let prefix = match id_or_prefix {
        IdOrPrefix::Full(uuid) => return Ok(uuid.to_string()),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let runners = client
        .list_runners(&RunnerFilterParams::default(), 0, RESOLUTION_WINDOW - 1)
        .await
        .context("Failed to fetch runners for ID resolution")?;

    unique_match("runner", prefix, runners.items.iter().map(|r| r.id.as_str()))
}

fn unique_match<'a>(
    kind: &str,
    prefix: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<String> {
    let matches: Vec<&str> = ids
        .filter(|id| id.to_lowercase().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, prefix)),
        [id] => Ok(id.to_string()),
        _ => Err(anyhow!(
            "Ambiguous prefix '{}' matches multiple {}s: {}",
            prefix,
            kind,
            matches.join(", ")
        )),
    }
}
