use crate::operation::{Operation, OperationId, OperationStatus};
use crate::tenant::{Tenant, TenantId};
use async_trait::async_trait;

/// Not-found is a distinct, matchable condition; everything else is opaque.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("tenant name already exists")]
    AlreadyExists,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: Tenant) -> Result<TenantId, RepositoryError>;
    async fn update(&self, tenant: &Tenant) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: TenantId) -> Result<Tenant, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Tenant, RepositoryError>;
    /// Reserved for administrative hard delete; the deletion workflow uses `update`.
    async fn delete(&self, id: TenantId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OperationRepository: Send + Sync {
    async fn create(&self, operation: Operation) -> Result<OperationId, RepositoryError>;
    async fn update(&self, operation: &Operation) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: OperationId) -> Result<Operation, RepositoryError>;
    /// Most recent first.
    async fn find_by_tenant_id(&self, tenant_id: TenantId) -> Result<Vec<Operation>, RepositoryError>;
    async fn find_by_status(&self, status: OperationStatus) -> Result<Vec<Operation>, RepositoryError>;
    /// Operations whose status is not `completed`/`failed`/`cancelled`.
    async fn find_incomplete(&self) -> Result<Vec<Operation>, RepositoryError>;
}
