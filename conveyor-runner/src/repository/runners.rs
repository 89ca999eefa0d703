//! Runners repository
//!
//! Handles communication with the registry for runner-related operations:
//! - Registering the runner and its competencies
//! - Pushing the runner status, which doubles as its heartbeat

use async_trait::async_trait;
use conveyor_client::RegistryClient;
use conveyor_core::domain::runner::RunnerStatus;
use conveyor_core::dto::runner::RegisterRunner;

use super::RegistryError;

/// Repository trait for runner-related operations with the registry
#[async_trait]
pub trait RunnerRepository: Send + Sync {
    /// Registers this runner
    ///
    /// # Returns
    /// The id the registry assigned
    async fn register(&self, req: &RegisterRunner) -> Result<String, RegistryError>;

    /// Sends the runner's current status
    async fn patch_status(&self, id: &str, status: RunnerStatus) -> Result<(), RegistryError>;
}

/// HTTP implementation of RunnerRepository
pub struct HttpRunnerRepository {
    client: RegistryClient,
}

impl HttpRunnerRepository {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RunnerRepository for HttpRunnerRepository {
    async fn register(&self, req: &RegisterRunner) -> Result<String, RegistryError> {
        let runner = self.client.register_runner(req).await?;
        Ok(runner.id)
    }

    async fn patch_status(&self, id: &str, status: RunnerStatus) -> Result<(), RegistryError> {
        Ok(self.client.patch_runner_status(id, status).await?)
    }
}
