//! Runner Service
//!
//! Business logic for runner registration and liveness.

use chrono::{DateTime, Duration, Utc};
use conveyor_core::change::{Change, RunnerValueChange, RunnerValueCreation};
use conveyor_core::domain::runner::{Runner, RunnerStatus};
use conveyor_core::dto::page::Page;
use conveyor_core::dto::runner::{RegisterRunner, RunnerStatusPatch};
use conveyor_core::query::RunnerQuery;
use thiserror::Error;

use crate::repository::{RepositoryError, RunnerRepository};

/// Service error type
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("runner {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("runner {0} was updated concurrently")]
    Conflict(String),
}

impl From<RepositoryError> for RunnerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => RunnerError::NotFound(id),
            RepositoryError::VersionConflict { id, .. } => RunnerError::Conflict(id),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Register a runner with the registry
///
/// New runners start IDLE unless they declared a status, with `created` and
/// `last_ping` set to now.
pub async fn register_runner(repo: &RunnerRepository, req: RegisterRunner) -> Result<Runner> {
    let creation = RunnerValueCreation::with(req.into());
    let validation = creation.validate();
    if !validation.is_valid() {
        return Err(RunnerError::Invalid(
            validation.message().unwrap_or("invalid runner").to_string(),
        ));
    }

    let runner = repo.create(creation.applied()).await?;

    tracing::info!(
        "Runner registered: {} ({})",
        runner.id,
        runner.value.callback.as_deref().unwrap_or_default()
    );

    Ok(runner)
}

/// Get a runner by ID
pub async fn get_runner(repo: &RunnerRepository, id: &str) -> Result<Runner> {
    repo.retrieve(id)
        .await?
        .ok_or_else(|| RunnerError::NotFound(id.to_string()))
}

/// Search runners, in registration order
pub async fn search_runners(
    repo: &RunnerRepository,
    query: &RunnerQuery,
    start: usize,
    end: usize,
) -> Result<Page<Runner>> {
    Ok(repo.search(query, start, end).await?)
}

/// Record a status notification from a runner
///
/// Doubles as the runner's heartbeat: `last_ping` moves to now.
pub async fn patch_runner_status(
    repo: &RunnerRepository,
    id: &str,
    patch: RunnerStatusPatch,
) -> Result<Runner> {
    let runner = get_runner(repo, id).await?;

    let change = RunnerValueChange::from(
        runner.value.clone(),
        runner.value.pinged(patch.status, Utc::now()),
    );
    let validation = change.validate();
    if !validation.is_valid() {
        return Err(RunnerError::Invalid(
            validation.message().unwrap_or("invalid change").to_string(),
        ));
    }

    let updated = repo.update(&runner, change.applied()).await?;

    tracing::debug!("Status received from runner {}: {}", id, patch.status);

    Ok(updated)
}

/// Mark runners that missed their time to live as DISCONNECTED
///
/// Returns how many runners were marked. A runner updated concurrently is left
/// for the next sweep.
pub async fn mark_stale_runners_disconnected(
    repo: &RunnerRepository,
    now: DateTime<Utc>,
) -> Result<usize> {
    let runners = repo.all(0, usize::MAX).await?;
    let mut marked = 0;

    for runner in runners.items.iter().filter(|r| is_stale(r, now)) {
        let disconnected = runner.value.with_status(RunnerStatus::Disconnected);
        match repo.update(runner, disconnected).await {
            Ok(_) => {
                tracing::info!("Runner {} missed its heartbeat, marked DISCONNECTED", runner.id);
                marked += 1;
            }
            Err(RepositoryError::VersionConflict { .. }) => {
                tracing::debug!("Runner {} changed during the stale sweep", runner.id);
            }
            Err(RepositoryError::NotFound(_)) => {}
        }
    }

    Ok(marked)
}

fn is_stale(runner: &Runner, now: DateTime<Utc>) -> bool {
    if runner.value.status() == Some(RunnerStatus::Disconnected) {
        return false;
    }
    match (runner.value.last_ping(), runner.value.time_to_live) {
        (Some(last_ping), Some(ttl)) => Duration::try_seconds(ttl)
            .and_then(|ttl| last_ping.checked_add_signed(ttl))
            .is_some_and(|deadline| deadline < now),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use conveyor_core::domain::runner::{Competencies, RunnerValue};
    use conveyor_core::query::RunnerCriteria;

    fn repository() -> InMemoryRepository<RunnerValue, RunnerQuery> {
        InMemoryRepository::new()
    }

    fn request(categories: &[&str], ttl: i64) -> RegisterRunner {
        RegisterRunner {
            callback: Some("http://runner:9000".to_string()),
            time_to_live: Some(ttl),
            competencies: Some(Competencies::new(
                categories.iter().map(|c| c.to_string()).collect(),
                vec![".*".to_string()],
            )),
        }
    }

    #[tokio::test]
    async fn test_register_starts_idle() {
        let repo = repository();
        let runner = register_runner(&repo, request(&["c"], 30)).await.unwrap();

        assert_eq!(runner.value.status(), Some(RunnerStatus::Idle));
        assert!(runner.value.last_ping().is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_zero_ttl() {
        let repo = repository();
        let err = register_runner(&repo, request(&["c"], 0))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RunnerError::Invalid(msg) if msg == "a runner time to live must be positive")
        );
    }

    #[tokio::test]
    async fn test_status_patch_refreshes_ping() {
        let repo = repository();
        let runner = register_runner(&repo, request(&["c"], 30)).await.unwrap();

        let patched = patch_runner_status(
            &repo,
            &runner.id,
            RunnerStatusPatch {
                status: RunnerStatus::Running,
            },
        )
        .await
        .unwrap();

        assert_eq!(patched.value.status(), Some(RunnerStatus::Running));
        assert!(patched.value.last_ping() >= runner.value.last_ping());
        assert_eq!(patched.version, 2);
    }

    #[tokio::test]
    async fn test_search_by_competency_pattern() {
        let repo = repository();
        register_runner(&repo, request(&["build-.*"], 30))
            .await
            .unwrap();
        register_runner(&repo, request(&["deploy"], 30)).await.unwrap();

        let query = RunnerQuery::new(vec![RunnerCriteria {
            category: Some("build-linux".to_string()),
            ..Default::default()
        }]);
        let page = search_runners(&repo, &query, 0, 99).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_stale_runners_are_disconnected() {
        let repo = repository();
        let fresh = register_runner(&repo, request(&["c"], 3600)).await.unwrap();
        let stale = register_runner(&repo, request(&["c"], 1)).await.unwrap();

        let later = Utc::now() + Duration::seconds(10);
        let marked = mark_stale_runners_disconnected(&repo, later).await.unwrap();
        assert_eq!(marked, 1);

        let stale = get_runner(&repo, &stale.id).await.unwrap();
        assert_eq!(stale.value.status(), Some(RunnerStatus::Disconnected));
        let fresh = get_runner(&repo, &fresh.id).await.unwrap();
        assert_eq!(fresh.value.status(), Some(RunnerStatus::Idle));

        let marked = mark_stale_runners_disconnected(&repo, later).await.unwrap();
        assert_eq!(marked, 0);
    }
}
