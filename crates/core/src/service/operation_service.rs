use crate::operation::{Operation, OperationId, OperationStatus};
use crate::repository::{OperationRepository, RepositoryError};
use crate::tenant::TenantId;
use chrono::{Duration, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum OperationServiceError {
    #[error("operation not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for OperationServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::AlreadyExists => Self::Internal(anyhow::anyhow!("unexpected conflict on read path")),
            RepositoryError::Internal(e) => Self::Internal(e),
        }
    }
}

/// Read-oriented queries over operation records (§4.5). Holds no workflow
/// handles; everything here comes straight from the repository.
pub struct OperationService {
    operation_repository: Arc<dyn OperationRepository>,
}

impl OperationService {
    pub fn new(operation_repository: Arc<dyn OperationRepository>) -> Self {
        Self { operation_repository }
    }

    pub async fn get_by_id(&self, id: OperationId) -> Result<Operation, OperationServiceError> {
        Ok(self.operation_repository.find_by_id(id).await?)
    }

    pub async fn list_incomplete_operations(&self) -> Result<Vec<Operation>, OperationServiceError> {
        Ok(self.operation_repository.find_incomplete().await?)
    }

    /// In-progress operations whose `started_at` is more than `threshold` in
    /// the past, a signal of a stuck workflow (§9: no reaper ships in this
    /// crate, but the query that would feed one does). Operations lacking a
    /// `started_at` are skipped.
    pub async fn list_stalled_operations(&self, threshold: Duration) -> Result<Vec<Operation>, OperationServiceError> {
        let incomplete = self.operation_repository.find_by_status(OperationStatus::InProgress).await?;
        let now = Utc::now();
        Ok(incomplete
            .into_iter()
            .filter(|op| match op.started_at {
                Some(started_at) => now - started_at > threshold,
                None => false,
            })
            .collect())
    }

    pub async fn get_operations_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Operation>, OperationServiceError> {
        Ok(self.operation_repository.find_by_tenant_id(tenant_id).await?)
    }

    pub async fn get_operation_progress(&self, id: OperationId) -> Result<u8, OperationServiceError> {
        let op = self.get_by_id(id).await?;
        op.progress().map_err(|e| OperationServiceError::Internal(anyhow::anyhow!(e)))
    }

    pub async fn get_operation_estimated_completion(
        &self,
        id: OperationId,
    ) -> Result<Option<chrono::DateTime<Utc>>, OperationServiceError> {
        let op = self.get_by_id(id).await?;
        Ok(op.estimated_completion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;
    use crate::storage::InMemoryOperationRepository;
    use std::collections::HashMap;

    #[tokio::test]
    async fn get_by_id_returns_not_found_for_unknown_id() {
        let repo = InMemoryOperationRepository::new();
        let service = OperationService::new(repo);
        let result = service.get_by_id(OperationId(1)).await;
        assert!(matches!(result, Err(OperationServiceError::NotFound)));
    }

    #[tokio::test]
    async fn list_incomplete_excludes_terminal_operations() {
        let repo = InMemoryOperationRepository::new();
        let service = OperationService::new(repo.clone());

        let pending = Operation::new(OperationType::TenantCreate, None, HashMap::new(), None);
        let pending_id = repo.create(pending).await.unwrap();

        let mut done = Operation::new(OperationType::TenantCreate, None, HashMap::new(), None);
        let done_id = repo.create(done.clone()).await.unwrap();
        done.id = done_id;
        done.start().unwrap();
        done.complete(HashMap::new()).unwrap();
        repo.update(&done).await.unwrap();

        let incomplete = service.list_incomplete_operations().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].id, pending_id);
    }

    #[tokio::test]
    async fn stalled_query_finds_in_progress_operations_past_their_budget() {
        let repo = InMemoryOperationRepository::new();
        let service = OperationService::new(repo.clone());

        let mut op = Operation::new(OperationType::TenantDelete, None, HashMap::new(), None);
        let id = repo.create(op.clone()).await.unwrap();
        op.id = id;
        op.start().unwrap();
        op.started_at = Some(Utc::now() - Duration::minutes(30));
        repo.update(&op).await.unwrap();

        let stalled = service.list_stalled_operations(Duration::minutes(1)).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].id, id);
    }

    #[tokio::test]
    async fn progress_and_eta_delegate_to_the_operation() {
        let repo = InMemoryOperationRepository::new();
        let service = OperationService::new(repo.clone());
        let op = Operation::new(OperationType::TenantCreate, None, HashMap::new(), None);
        let id = repo.create(op).await.unwrap();

        assert_eq!(service.get_operation_progress(id).await.unwrap(), 0);
        assert!(service.get_operation_estimated_completion(id).await.unwrap().is_some());
    }
}
