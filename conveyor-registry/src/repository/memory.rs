//! In-memory repository
//!
//! Keeps entities in creation order behind a single `RwLock`; the version check
//! and the write of `update` happen under the same write guard.

use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use conveyor_core::domain::entity::Entity;
use conveyor_core::dto::page::Page;
use conveyor_core::query::{Document, Filter, IntoFilter};
use uuid::Uuid;

use super::{Repository, RepositoryError};

pub struct InMemoryRepository<V, Q> {
    entities: RwLock<Vec<Entity<V>>>,
    _query: PhantomData<fn() -> Q>,
}

impl<V, Q> InMemoryRepository<V, Q> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
            _query: PhantomData,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entity<V>>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entity<V>>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V, Q> Default for InMemoryRepository<V, Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V, Q> Repository<V, Q> for InMemoryRepository<V, Q>
where
    V: Document + Clone + Send + Sync + 'static,
    Q: IntoFilter + Send + Sync + 'static,
{
    async fn create(&self, value: V) -> Result<Entity<V>, RepositoryError> {
        let entity = Entity::new(Uuid::new_v4().to_string(), 1, value);
        self.write().push(entity.clone());
        Ok(entity)
    }

    async fn retrieve(&self, id: &str) -> Result<Option<Entity<V>>, RepositoryError> {
        Ok(self.read().iter().find(|e| e.id == id).cloned())
    }

    async fn update(&self, entity: &Entity<V>, value: V) -> Result<Entity<V>, RepositoryError> {
        let mut entities = self.write();
        let stored = entities
            .iter_mut()
            .find(|e| e.id == entity.id)
            .ok_or_else(|| RepositoryError::NotFound(entity.id.clone()))?;

        if stored.version != entity.version {
            return Err(RepositoryError::VersionConflict {
                id: entity.id.clone(),
                expected: entity.version,
                actual: stored.version,
            });
        }

        stored.version += 1;
        stored.value = value;
        Ok(stored.clone())
    }

    async fn delete(&self, entity: &Entity<V>) -> Result<(), RepositoryError> {
        let mut entities = self.write();
        let before = entities.len();
        entities.retain(|e| e.id != entity.id);
        if entities.len() == before {
            return Err(RepositoryError::NotFound(entity.id.clone()));
        }
        Ok(())
    }

    async fn all(&self, start: usize, end: usize) -> Result<Page<Entity<V>>, RepositoryError> {
        Ok(Page::window(self.read().clone(), start, end))
    }

    async fn search(
        &self,
        query: &Q,
        start: usize,
        end: usize,
    ) -> Result<Page<Entity<V>>, RepositoryError> {
        let filter = query.to_filter();
        let matching = self
            .read()
            .iter()
            .filter(|e| filter.matches(&e.value))
            .cloned()
            .collect();
        Ok(Page::window(matching, start, end))
    }

    async fn delete_from(&self, filter: &Filter) -> Result<u64, RepositoryError> {
        let mut entities = self.write();
        let before = entities.len();
        entities.retain(|e| !filter.matches(&e.value));
        Ok((before - entities.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::domain::job::{ExitStatus, JobStatus, JobValue, RunStatus};
    use conveyor_core::query::job::{JobCriteria, JobQuery, RUN_STATUS};

    fn repository() -> InMemoryRepository<JobValue, JobQuery> {
        InMemoryRepository::new()
    }

    fn job(name: &str, status: JobStatus) -> JobValue {
        JobValue::builder()
            .name(name)
            .category("c")
            .account_id("a1")
            .status(status)
            .build()
    }

    #[tokio::test]
    async fn test_create_and_retrieve() {
        let repo = repository();
        let created = repo.create(job("a", JobStatus::pending())).await.unwrap();
        assert_eq!(created.version, 1);

        let found = repo.retrieve(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(repo.retrieve("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = repository();
        let created = repo.create(job("a", JobStatus::pending())).await.unwrap();

        let updated = repo
            .update(&created, job("a", JobStatus::running()))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.value.status.run, Some(RunStatus::Running));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = repository();
        let created = repo.create(job("a", JobStatus::pending())).await.unwrap();
        repo.update(&created, job("a", JobStatus::running()))
            .await
            .unwrap();

        let err = repo
            .update(&created, job("a", JobStatus::running()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_keeps_creation_order_and_windows() {
        let repo = repository();
        for name in ["a", "b", "c", "d"] {
            repo.create(job(name, JobStatus::pending())).await.unwrap();
        }
        repo.create(job("e", JobStatus::running())).await.unwrap();

        let query = JobQuery::single(JobCriteria {
            run_status: Some(RunStatus::Pending),
            ..Default::default()
        });
        let page = repo.search(&query, 1, 2).await.unwrap();
        let names: Vec<_> = page
            .items
            .iter()
            .map(|j| j.value.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(page.total, 4);

        let all = repo.all(0, 99).await.unwrap();
        assert_eq!(all.total, 5);
    }

    #[tokio::test]
    async fn test_delete_and_delete_from() {
        let repo = repository();
        let a = repo.create(job("a", JobStatus::pending())).await.unwrap();
        repo.create(job("b", JobStatus::done(ExitStatus::Success)))
            .await
            .unwrap();
        repo.create(job("c", JobStatus::done(ExitStatus::Failure)))
            .await
            .unwrap();

        let removed = repo
            .delete_from(&Filter::eq(RUN_STATUS, "DONE"))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        repo.delete(&a).await.unwrap();
        assert!(matches!(
            repo.delete(&a).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert_eq!(repo.all(0, 10).await.unwrap().total, 0);
    }
}
