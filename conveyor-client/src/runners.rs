//! Runner registry endpoints

use crate::RegistryClient;
use crate::error::Result;
use conveyor_core::domain::runner::{Runner, RunnerStatus};
use conveyor_core::dto::page::Page;
use conveyor_core::dto::runner::{RegisterRunner, RunnerFilterParams, RunnerStatusPatch};

impl RegistryClient {
    // =============================================================================
    // Runner Registration & Lifecycle
    // =============================================================================

    /// Register a runner
    ///
    /// # Returns
    /// The registered runner, carrying the id the registry assigned
    pub async fn register_runner(&self, req: &RegisterRunner) -> Result<Runner> {
        let url = format!("{}/runners", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Notify the registry of a runner's status
    ///
    /// Also refreshes the runner's last ping.
    pub async fn patch_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<()> {
        let url = format!("{}/runners/{}", self.base_url, runner_id);
        let response = self
            .client
            .patch(&url)
            .json(&RunnerStatusPatch { status })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Runner Query
    // =============================================================================

    /// List registered runners matching a filter
    pub async fn list_runners(
        &self,
        filter: &RunnerFilterParams,
        start: usize,
        end: usize,
    ) -> Result<Page<Runner>> {
        let url = format!("{}/runners", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(filter)
            .query(&[("start", start), ("end", end)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get details for a specific runner
    pub async fn get_runner(&self, runner_id: &str) -> Result<Runner> {
        let url = format!("{}/runners/{}", self.base_url, runner_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
