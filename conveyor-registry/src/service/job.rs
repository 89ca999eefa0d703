//! Job Service
//!
//! Business logic for job submission and lifecycle.

use chrono::{DateTime, Utc};
use conveyor_core::change::{Change, JobValueChange, JobValueCreation};
use conveyor_core::domain::job::Job;
use conveyor_core::dto::job::{CreateJob, JobPatch};
use conveyor_core::dto::page::Page;
use conveyor_core::query::JobQuery;
use thiserror::Error;

use crate::repository::{JobRepository, RepositoryError};

/// Service error type
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("job {id} is at version {actual}, not {expected}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
}

impl From<RepositoryError> for JobError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => JobError::NotFound(id),
            RepositoryError::VersionConflict {
                id,
                expected,
                actual,
            } => JobError::VersionConflict {
                id,
                expected,
                actual,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Submit a new job
///
/// The job is stored PENDING with its submission time, whatever status the
/// request carried.
pub async fn launch_job(repo: &JobRepository, req: CreateJob) -> Result<Job> {
    let creation = JobValueCreation::with(req.into());
    let validation = creation.validate();
    if !validation.is_valid() {
        return Err(JobError::Invalid(
            validation.message().unwrap_or("invalid job").to_string(),
        ));
    }

    let job = repo.create(creation.applied()).await?;

    tracing::info!(
        "Job created: {} ({})",
        job.id,
        job.value.name.as_deref().unwrap_or_default()
    );

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(repo: &JobRepository, id: &str) -> Result<Job> {
    repo.retrieve(id)
        .await?
        .ok_or_else(|| JobError::NotFound(id.to_string()))
}

/// Search jobs, in submission order
pub async fn search_jobs(
    repo: &JobRepository,
    query: &JobQuery,
    start: usize,
    end: usize,
) -> Result<Page<Job>> {
    Ok(repo.search(query, start, end).await?)
}

/// Conditionally patch a job
///
/// The patch must name the stored version; the resulting transition must pass
/// the job lifecycle rules.
pub async fn patch_job(repo: &JobRepository, id: &str, patch: JobPatch) -> Result<Job> {
    patch_job_at(repo, id, patch, Utc::now()).await
}

async fn patch_job_at(
    repo: &JobRepository,
    id: &str,
    patch: JobPatch,
    now: DateTime<Utc>,
) -> Result<Job> {
    let job = get_job(repo, id).await?;

    if job.version != patch.version {
        return Err(JobError::VersionConflict {
            id: id.to_string(),
            expected: patch.version,
            actual: job.version,
        });
    }

    let change = JobValueChange::from(job.value.clone(), patch.apply_to(&job.value));
    let validation = change.validate();
    if !validation.is_valid() {
        return Err(JobError::Invalid(
            validation.message().unwrap_or("invalid change").to_string(),
        ));
    }

    let updated = repo.update(&job, change.applied_at(now)).await?;

    tracing::debug!(
        "Job {} patched to {} (version {})",
        updated.id,
        updated
            .value
            .run_status()
            .map(|s| s.to_string())
            .unwrap_or_default(),
        updated.version
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use conveyor_core::domain::job::{ExitStatus, JobStatus, JobValue, RunStatus};
    use conveyor_core::query::JobCriteria;

    fn repository() -> InMemoryRepository<JobValue, JobQuery> {
        InMemoryRepository::new()
    }

    fn request(name: &str) -> CreateJob {
        CreateJob {
            name: Some(name.to_string()),
            category: Some("c".to_string()),
            account_id: Some("a1".to_string()),
            arguments: vec![],
        }
    }

    #[tokio::test]
    async fn test_launch_forces_pending() {
        let repo = repository();
        let job = launch_job(&repo, request("n")).await.unwrap();

        assert_eq!(job.value.status, JobStatus::pending());
        assert!(job.value.processing.submitted.is_some());
        assert_eq!(job.version, 1);
    }

    #[tokio::test]
    async fn test_launch_rejects_missing_account() {
        let repo = repository();
        let mut req = request("n");
        req.account_id = None;

        let err = launch_job(&repo, req).await.unwrap_err();
        assert!(matches!(err, JobError::Invalid(msg) if msg == "a job must have an account id"));
    }

    #[tokio::test]
    async fn test_patch_lifecycle() {
        let repo = repository();
        let job = launch_job(&repo, request("n")).await.unwrap();

        let running = patch_job(&repo, &job.id, JobPatch::reserve(job.version))
            .await
            .unwrap();
        assert_eq!(running.value.run_status(), Some(RunStatus::Running));
        assert!(running.value.processing.started.is_some());

        let done = running
            .value
            .with_status(RunStatus::Done, Some(ExitStatus::Success))
            .with_result("ok");
        let done = patch_job(&repo, &job.id, JobPatch::report(running.version, &done))
            .await
            .unwrap();
        assert!(done.value.processing.finished.is_some());
        assert_eq!(done.value.result.as_deref(), Some("ok"));

        let err = patch_job(&repo, &job.id, JobPatch::reserve(done.version))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Invalid(msg) if msg.contains("DONE")));
    }

    #[tokio::test]
    async fn test_second_reservation_conflicts() {
        let repo = repository();
        let job = launch_job(&repo, request("n")).await.unwrap();

        patch_job(&repo, &job.id, JobPatch::reserve(job.version))
            .await
            .unwrap();
        let err = patch_job(&repo, &job.id, JobPatch::reserve(job.version))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_by_run_status() {
        let repo = repository();
        let a = launch_job(&repo, request("a")).await.unwrap();
        launch_job(&repo, request("b")).await.unwrap();
        patch_job(&repo, &a.id, JobPatch::reserve(a.version))
            .await
            .unwrap();

        let query = JobQuery::single(JobCriteria {
            run_status: Some(RunStatus::Pending),
            ..Default::default()
        });
        let page = search_jobs(&repo, &query, 0, 99).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].value.name.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_get_missing_job() {
        let repo = repository();
        assert!(matches!(
            get_job(&repo, "nope").await,
            Err(JobError::NotFound(_))
        ));
    }
}
