//! Repository Module
//!
//! Data access layer for the registry.
//! Jobs and runners share one generic repository contract; the version carried
//! by an entity is the optimistic-concurrency guard of `update`.

pub mod memory;

use async_trait::async_trait;
use conveyor_core::domain::entity::Entity;
use conveyor_core::domain::job::JobValue;
use conveyor_core::domain::runner::RunnerValue;
use conveyor_core::dto::page::Page;
use conveyor_core::query::{Filter, JobQuery, RunnerQuery};
use thiserror::Error;

pub use memory::InMemoryRepository;

/// Storage errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity {0} not found")]
    NotFound(String),

    #[error("entity {id} is at version {actual}, not {expected}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
}

/// Generic entity repository
#[async_trait]
pub trait Repository<V, Q>: Send + Sync
where
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
{
    /// Stores a new value under a fresh id, at version 1
    async fn create(&self, value: V) -> Result<Entity<V>, RepositoryError>;

    async fn retrieve(&self, id: &str) -> Result<Option<Entity<V>>, RepositoryError>;

    /// Replaces the value of `entity`, provided its version is still the stored one
    async fn update(&self, entity: &Entity<V>, value: V) -> Result<Entity<V>, RepositoryError>;

    async fn delete(&self, entity: &Entity<V>) -> Result<(), RepositoryError>;

    /// Inclusive `start..=end` window of every entity, in creation order
    async fn all(&self, start: usize, end: usize) -> Result<Page<Entity<V>>, RepositoryError>;

    /// Inclusive `start..=end` window of the entities matching `query`
    async fn search(
        &self,
        query: &Q,
        start: usize,
        end: usize,
    ) -> Result<Page<Entity<V>>, RepositoryError>;

    /// Deletes every entity matching `filter`, returning how many went
    async fn delete_from(&self, filter: &Filter) -> Result<u64, RepositoryError>;
}

pub type JobRepository = dyn Repository<JobValue, JobQuery>;
pub type RunnerRepository = dyn Repository<RunnerValue, RunnerQuery>;
