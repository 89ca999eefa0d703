//! Jobs repository
//!
//! Handles communication with the registry for job-related operations:
//! - Listing pending candidates
//! - Conditionally patching jobs (reservation and reports)

use async_trait::async_trait;
use conveyor_client::RegistryClient;
use conveyor_core::domain::job::Job;
use conveyor_core::dto::job::{JobFilterParams, JobPatch};

use super::RegistryError;

/// Repository trait for job-related operations with the registry
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Fetches up to `window` jobs matching `filter`, in registry order
    async fn list_candidates(
        &self,
        filter: &JobFilterParams,
        window: usize,
    ) -> Result<Vec<Job>, RegistryError>;

    /// Patches a job, guarded by `patch.version`
    ///
    /// # Returns
    /// The job as stored after the patch
    async fn patch_job(&self, id: &str, patch: &JobPatch) -> Result<Job, RegistryError>;
}

/// HTTP implementation of JobRepository
pub struct HttpJobRepository {
    client: RegistryClient,
}

impl HttpJobRepository {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn list_candidates(
        &self,
        filter: &JobFilterParams,
        window: usize,
    ) -> Result<Vec<Job>, RegistryError> {
        if window == 0 {
            return Ok(Vec::new());
        }
        let page = self.client.list_jobs(filter, 0, window - 1).await?;
        Ok(page.items)
    }

    async fn patch_job(&self, id: &str, patch: &JobPatch) -> Result<Job, RegistryError> {
        Ok(self.client.patch_job(id, patch).await?)
    }
}
