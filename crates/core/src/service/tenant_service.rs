use crate::events::{Event, EventSink};
use crate::operation::{Operation, OperationId, OperationType};
use crate::repository::{OperationRepository, RepositoryError, TenantRepository};
use crate::service::registry::WorkflowRegistry;
use crate::tenant::{Region, Tenant, TenantError, TenantId, Tier};
use crate::workflow::factory::WorkflowFactory;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TenantServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] TenantError),
    #[error("tenant already exists")]
    AlreadyExists,
    #[error("tenant not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for TenantServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::AlreadyExists => Self::AlreadyExists,
            RepositoryError::Internal(e) => Self::Internal(e),
        }
    }
}

pub struct CreateTenantParams {
    pub name: String,
    pub region: String,
    pub tier: Option<String>,
    pub isolation_group_id: Option<String>,
}

/// Orchestrates validation, persistence, workflow launch, and tracking for
/// tenant create/delete intents (§4.4).
pub struct TenantService {
    tenant_repository: Arc<dyn TenantRepository>,
    operation_repository: Arc<dyn OperationRepository>,
    factory: Arc<WorkflowFactory>,
    registry: Arc<WorkflowRegistry>,
    event_sink: Arc<dyn EventSink>,
}

impl TenantService {
    pub fn new(
        tenant_repository: Arc<dyn TenantRepository>,
        operation_repository: Arc<dyn OperationRepository>,
        factory: Arc<WorkflowFactory>,
        registry: Arc<WorkflowRegistry>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self { tenant_repository, operation_repository, factory, registry, event_sink }
    }

    pub async fn create(&self, params: CreateTenantParams) -> Result<(TenantId, OperationId), TenantServiceError> {
        let region = Region::parse(&params.region).ok_or_else(|| {
            TenantServiceError::Validation(TenantError::Validation {
                field: "region",
                reason: format!("unknown region '{}'", params.region),
            })
        })?;
        let tier = match params.tier.as_deref() {
            Some(t) => Tier::parse(t).ok_or_else(|| {
                TenantServiceError::Validation(TenantError::Validation {
                    field: "tier",
                    reason: format!("unknown tier '{t}'"),
                })
            })?,
            None => Tier::default(),
        };

        // 1. Look up by name: a pre-existing tenant is a synchronous conflict.
        match self.tenant_repository.find_by_name(&params.name).await {
            Ok(_) => return Err(TenantServiceError::AlreadyExists),
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        // 2. Construct the domain entity; validation errors fail synchronously.
        let tenant = Tenant::new(&params.name, region, tier, params.isolation_group_id.clone())?;

        // 3. Persist tenant.
        let tenant_id = self.tenant_repository.create(tenant.clone()).await?;
        let mut tenant = tenant;
        tenant.id = tenant_id;

        // 4. Construct and persist the operation.
        let mut parameters = HashMap::new();
        parameters.insert("name".to_string(), Value::String(params.name.clone()));
        parameters.insert("region".to_string(), Value::String(region.as_str().to_string()));
        parameters.insert("tier".to_string(), Value::String(tier.as_str().to_string()));
        if let Some(group) = &params.isolation_group_id {
            parameters.insert("isolation_group_id".to_string(), Value::String(group.clone()));
        }
        let operation = Operation::new(OperationType::TenantCreate, Some(tenant_id), parameters, None);
        let operation_id = self.operation_repository.create(operation.clone()).await?;
        let mut operation = operation;
        operation.id = operation_id;

        self.event_sink.emit(Event::OperationCreated { operation_id, operation_type: "tenant.create".to_string() });

        // 5-8. Build, register, and launch the workflow on a detached context.
        self.launch(OperationType::TenantCreate, tenant, operation).await?;

        // 9. Return synchronously.
        Ok((tenant_id, operation_id))
    }

    pub async fn delete(&self, tenant_id: TenantId) -> Result<(OperationId, TenantId), TenantServiceError> {
        let tenant = self.tenant_repository.find_by_id(tenant_id).await?;

        let mut parameters = HashMap::new();
        parameters.insert("tenant_id".to_string(), Value::from(tenant_id.0));
        let operation = Operation::new(OperationType::TenantDelete, Some(tenant_id), parameters, None);
        let operation_id = self.operation_repository.create(operation.clone()).await?;
        let mut operation = operation;
        operation.id = operation_id;

        self.event_sink.emit(Event::OperationCreated { operation_id, operation_type: "tenant.delete".to_string() });

        self.launch(OperationType::TenantDelete, tenant, operation).await?;

        Ok((operation_id, tenant_id))
    }

    pub async fn get_operation_status(&self, operation_id: OperationId) -> Result<Operation, TenantServiceError> {
        Ok(self.operation_repository.find_by_id(operation_id).await?)
    }

    async fn launch(
        &self,
        operation_type: OperationType,
        tenant: Tenant,
        operation: Operation,
    ) -> Result<(), TenantServiceError> {
        let operation_id = operation.id;
        let workflow = Arc::new(
            self.factory
                .build(operation_type, tenant, operation)
                .map_err(|e| TenantServiceError::Internal(anyhow::anyhow!(e)))?,
        );

        // Register before starting: the live set must hold a handle on every
        // in-flight workflow from the moment it begins executing, not after.
        self.registry.register(operation_id, workflow.clone()).await;

        let registry = self.registry.clone();
        let workflow_for_registry = workflow.clone();

        // Detached context: carries no cancellation tie to the request that
        // triggered this launch, so completing the HTTP response can never
        // abort the workflow. The correlation id is the only thing that
        // survives from the request; it exists purely so a log line from
        // deep inside a step body can be tied back to the originating call.
        let correlation_id = Uuid::new_v4();
        let detached = CancellationToken::new();
        workflow.start(operation_id, detached);

        let span = tracing::info_span!("tenant_workflow", %operation_id, %correlation_id);
        tokio::spawn(
            async move {
                // The monitor task's only job is to wait for the single result
                // and clean up the live-workflow entry; the operation record,
                // not this registry, is the source of truth for callers.
                let _ = workflow_for_registry.result().await;
                registry.deregister(operation_id).await;
            }
            .instrument(span),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingEventSink;
    use crate::operation::OperationStatus;
    use crate::storage::{InMemoryOperationRepository, InMemoryTenantRepository};
    use crate::tenant::TenantStatus;
    use std::time::Duration;

    fn make_service() -> (TenantService, Arc<dyn TenantRepository>, Arc<dyn OperationRepository>) {
        let tenant_repo = InMemoryTenantRepository::new();
        let op_repo = InMemoryOperationRepository::new();
        let factory = Arc::new(WorkflowFactory::new(
            tenant_repo.clone(),
            op_repo.clone(),
            Arc::new(TracingEventSink),
            None,
        ));
        let registry = WorkflowRegistry::new();
        let service = TenantService::new(
            tenant_repo.clone(),
            op_repo.clone(),
            factory,
            registry,
            Arc::new(TracingEventSink),
        );
        (service, tenant_repo, op_repo)
    }

    #[tokio::test]
    async fn create_returns_synchronously_and_eventually_completes() {
        let (service, tenant_repo, op_repo) = make_service();
        let (tenant_id, operation_id) = service
            .create(CreateTenantParams {
                name: "acme".to_string(),
                region: "eu1".to_string(),
                tier: Some("pro".to_string()),
                isolation_group_id: None,
            })
            .await
            .unwrap();

        let operation = op_repo.find_by_id(operation_id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Pending);

        // Give the detached workflow a moment to run to completion.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let operation = op_repo.find_by_id(operation_id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
        let tenant = tenant_repo.find_by_id(tenant_id).await.unwrap();
        assert_eq!(tenant.status, TenantStatus::Active);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_synchronous_conflict() {
        let (service, _tenant_repo, op_repo) = make_service();
        service
            .create(CreateTenantParams {
                name: "acme".to_string(),
                region: "us1".to_string(),
                tier: None,
                isolation_group_id: None,
            })
            .await
            .unwrap();

        let result = service
            .create(CreateTenantParams {
                name: "acme".to_string(),
                region: "us1".to_string(),
                tier: None,
                isolation_group_id: None,
            })
            .await;
        assert!(matches!(result, Err(TenantServiceError::AlreadyExists)));

        let incomplete = op_repo.find_incomplete().await.unwrap();
        assert_eq!(incomplete.len(), 1, "no operation should be created for the rejected duplicate");
    }

    #[tokio::test]
    async fn invalid_name_is_a_synchronous_validation_error() {
        let (service, _tenant_repo, _op_repo) = make_service();
        let result = service
            .create(CreateTenantParams {
                name: "Bad Name".to_string(),
                region: "us1".to_string(),
                tier: None,
                isolation_group_id: None,
            })
            .await;
        assert!(matches!(result, Err(TenantServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_unknown_tenant_is_not_found() {
        let (service, _tenant_repo, _op_repo) = make_service();
        let result = service.delete(TenantId(99999)).await;
        assert!(matches!(result, Err(TenantServiceError::NotFound)));
    }

    #[tokio::test]
    async fn delete_existing_tenant_completes_and_marks_deleted() {
        let (service, tenant_repo, op_repo) = make_service();
        let (tenant_id, _) = service
            .create(CreateTenantParams {
                name: "acme".to_string(),
                region: "us1".to_string(),
                tier: None,
                isolation_group_id: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (operation_id, returned_tenant_id) = service.delete(tenant_id).await.unwrap();
        assert_eq!(returned_tenant_id, tenant_id);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let operation = op_repo.find_by_id(operation_id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
        let tenant = tenant_repo.find_by_id(tenant_id).await.unwrap();
        assert_eq!(tenant.status, TenantStatus::Deleted);
    }
}
