use crate::operation::{Operation, OperationId, OperationStatus};
use crate::repository::{OperationRepository, RepositoryError, TenantRepository};
use crate::tenant::{Tenant, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reference `TenantRepository` backed by an in-process map. Sufficient for
/// tests and for the server binary's default (no-database) run mode; a real
/// deployment swaps this for a database-backed implementation without
/// touching anything in the engine.
#[derive(Default)]
pub struct InMemoryTenantRepository {
    next_id: AtomicI64,
    tenants: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            tenants: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn create(&self, mut tenant: Tenant) -> Result<TenantId, RepositoryError> {
        let mut tenants = self.tenants.write().await;
        if tenants.values().any(|t| t.name == tenant.name) {
            return Err(RepositoryError::AlreadyExists);
        }
        let id = TenantId(self.next_id.fetch_add(1, Ordering::SeqCst));
        tenant.id = id;
        tenants.insert(id, tenant);
        Ok(id)
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.write().await;
        if !tenants.contains_key(&tenant.id) {
            return Err(RepositoryError::NotFound);
        }
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Tenant, RepositoryError> {
        self.tenants.read().await.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn find_by_name(&self, name: &str) -> Result<Tenant, RepositoryError> {
        self.tenants
            .read()
            .await
            .values()
            .find(|t| t.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: TenantId) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.write().await;
        tenants.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

/// Reference `OperationRepository`, mirroring `InMemoryTenantRepository`.
#[derive(Default)]
pub struct InMemoryOperationRepository {
    next_id: AtomicI64,
    operations: RwLock<HashMap<OperationId, Operation>>,
}

impl InMemoryOperationRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            operations: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl OperationRepository for InMemoryOperationRepository {
    async fn create(&self, mut operation: Operation) -> Result<OperationId, RepositoryError> {
        let mut operations = self.operations.write().await;
        let id = OperationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        operation.id = id;
        operations.insert(id, operation);
        Ok(id)
    }

    async fn update(&self, operation: &Operation) -> Result<(), RepositoryError> {
        let mut operations = self.operations.write().await;
        if !operations.contains_key(&operation.id) {
            return Err(RepositoryError::NotFound);
        }
        operations.insert(operation.id, operation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OperationId) -> Result<Operation, RepositoryError> {
        self.operations.read().await.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn find_by_tenant_id(&self, tenant_id: TenantId) -> Result<Vec<Operation>, RepositoryError> {
        let mut ops: Vec<Operation> = self
            .operations
            .read()
            .await
            .values()
            .filter(|op| op.tenant_id == Some(tenant_id))
            .cloned()
            .collect();
        ops.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ops)
    }

    async fn find_by_status(&self, status: OperationStatus) -> Result<Vec<Operation>, RepositoryError> {
        Ok(self
            .operations
            .read()
            .await
            .values()
            .filter(|op| op.status == status)
            .cloned()
            .collect())
    }

    async fn find_incomplete(&self) -> Result<Vec<Operation>, RepositoryError> {
        Ok(self
            .operations
            .read()
            .await
            .values()
            .filter(|op| !op.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;
    use crate::tenant::{Region, Tier};

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_enforces_name_uniqueness() {
        let repo = InMemoryTenantRepository::new();
        let a = Tenant::new("acme", Region::Us1, Tier::Free, None).unwrap();
        let id = repo.create(a).await.unwrap();
        assert_eq!(id, TenantId(1));

        let dup = Tenant::new("acme", Region::Us1, Tier::Free, None).unwrap();
        assert!(matches!(repo.create(dup).await, Err(RepositoryError::AlreadyExists)));
    }

    #[tokio::test]
    async fn find_by_id_and_name_round_trip() {
        let repo = InMemoryTenantRepository::new();
        let t = Tenant::new("acme", Region::Eu1, Tier::Pro, None).unwrap();
        let id = repo.create(t).await.unwrap();

        let by_id = repo.find_by_id(id).await.unwrap();
        assert_eq!(by_id.name, "acme");
        let by_name = repo.find_by_name("acme").await.unwrap();
        assert_eq!(by_name.id, id);

        assert!(matches!(repo.find_by_id(TenantId(999)).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn operation_repository_filters_by_tenant_and_status() {
        let repo = InMemoryOperationRepository::new();
        let tenant_id = TenantId(1);
        let op1 = Operation::new(OperationType::TenantCreate, Some(tenant_id), Default::default(), None);
        let op2 = Operation::new(OperationType::TenantDelete, Some(tenant_id), Default::default(), None);
        repo.create(op1).await.unwrap();
        repo.create(op2).await.unwrap();

        let for_tenant = repo.find_by_tenant_id(tenant_id).await.unwrap();
        assert_eq!(for_tenant.len(), 2);

        let pending = repo.find_by_status(OperationStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 2);

        let incomplete = repo.find_incomplete().await.unwrap();
        assert_eq!(incomplete.len(), 2);
    }
}
