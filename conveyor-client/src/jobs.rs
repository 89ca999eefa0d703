//! Job registry endpoints

use crate::RegistryClient;
use crate::error::Result;
use conveyor_core::domain::job::Job;
use conveyor_core::dto::job::{CreateJob, JobFilterParams, JobPatch};
use conveyor_core::dto::page::Page;

impl RegistryClient {
    /// Submit a new job
    ///
    /// The registry forces the job to PENDING and stamps its submission time.
    pub async fn launch_job(&self, req: &CreateJob) -> Result<Job> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List jobs matching a filter
    ///
    /// # Arguments
    /// * `filter` - Single-criterion filter
    /// * `start`, `end` - Inclusive window of the listing
    pub async fn list_jobs(
        &self,
        filter: &JobFilterParams,
        start: usize,
        end: usize,
    ) -> Result<Page<Job>> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(filter)
            .query(&[("start", start), ("end", end)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Conditionally patch a job
    ///
    /// Fails with a 409 API error when `patch.version` is no longer the
    /// stored version, and with a 400 when the transition is not allowed.
    pub async fn patch_job(&self, job_id: &str, patch: &JobPatch) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.patch(&url).json(patch).send().await?;

        self.handle_response(response).await
    }
}
