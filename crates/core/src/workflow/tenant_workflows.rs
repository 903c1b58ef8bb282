use crate::events::{Event, EventSink};
use crate::operation::{Operation, OperationId};
use crate::repository::{OperationRepository, TenantRepository};
use crate::tenant::{Tenant, TenantId};
use crate::workflow::engine::{Step, StepFuture, Workflow};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Side-effect placeholders: the environment defines their real behavior.
/// Here each simulates work with a short sleep and always succeeds; swapping
/// this body for a real cloud call does not change the workflow's shape.
fn placeholder_step(name: &'static str) -> Step {
    Step::new(name, format!("placeholder for {name}"), move |_ctx| -> StepFuture {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        })
    })
}

fn finalize_activate_step(tenant: Arc<Mutex<Tenant>>, repo: Arc<dyn TenantRepository>) -> Step {
    Step::new("finalize", "transition tenant provisioning -> active", move |_ctx| -> StepFuture {
        let tenant = tenant.clone();
        let repo = repo.clone();
        Box::pin(async move {
            let mut t = tenant.lock().unwrap().clone();
            t.activate().map_err(|e| e.to_string())?;
            repo.update(&t).await.map_err(|e| e.to_string())?;
            *tenant.lock().unwrap() = t;
            Ok(())
        })
    })
}

fn deactivate_step(tenant: Arc<Mutex<Tenant>>, repo: Arc<dyn TenantRepository>) -> Step {
    Step::new("deactivate", "transition tenant to deleting", move |_ctx| -> StepFuture {
        let tenant = tenant.clone();
        let repo = repo.clone();
        Box::pin(async move {
            let mut t = tenant.lock().unwrap().clone();
            t.begin_deleting().map_err(|e| e.to_string())?;
            repo.update(&t).await.map_err(|e| e.to_string())?;
            *tenant.lock().unwrap() = t;
            Ok(())
        })
    })
}

fn finalize_delete_step(tenant: Arc<Mutex<Tenant>>, repo: Arc<dyn TenantRepository>) -> Step {
    Step::new("finalize", "transition tenant to deleted", move |_ctx| -> StepFuture {
        let tenant = tenant.clone();
        let repo = repo.clone();
        Box::pin(async move {
            let mut t = tenant.lock().unwrap().clone();
            t.finish_deleting().map_err(|e| e.to_string())?;
            repo.update(&t).await.map_err(|e| e.to_string())?;
            *tenant.lock().unwrap() = t;
            Ok(())
        })
    })
}

/// Builds the `tenant.create` workflow: `initialize`, `provision-database`,
/// `setup-secrets`, `deploy-resources`, `finalize`.
pub fn build_create_workflow(
    tenant: Tenant,
    operation: Operation,
    tenant_repository: Arc<dyn TenantRepository>,
    operation_repository: Arc<dyn OperationRepository>,
    event_sink: Arc<dyn EventSink>,
    workflow_timeout: Option<Duration>,
) -> Workflow {
    let tenant_id = tenant.id;
    let tenant_cell = Arc::new(Mutex::new(tenant));

    let steps = vec![
        placeholder_step("initialize"),
        placeholder_step("provision-database"),
        placeholder_step("setup-secrets"),
        placeholder_step("deploy-resources"),
        finalize_activate_step(tenant_cell.clone(), tenant_repository.clone()),
    ];

    TenantWorkflow::new(
        "tenant.create",
        steps,
        tenant_id,
        operation,
        operation_repository,
        event_sink,
        workflow_timeout,
    )
    .into_workflow()
}

/// Builds the `tenant.delete` workflow: `deactivate`, `remove-resources`,
/// `cleanup-secrets`, `remove-database`, `finalize`.
pub fn build_delete_workflow(
    tenant: Tenant,
    operation: Operation,
    tenant_repository: Arc<dyn TenantRepository>,
    operation_repository: Arc<dyn OperationRepository>,
    event_sink: Arc<dyn EventSink>,
    workflow_timeout: Option<Duration>,
) -> Workflow {
    let tenant_id = tenant.id;
    let tenant_cell = Arc::new(Mutex::new(tenant));

    let steps = vec![
        deactivate_step(tenant_cell.clone(), tenant_repository.clone()),
        placeholder_step("remove-resources"),
        placeholder_step("cleanup-secrets"),
        placeholder_step("remove-database"),
        finalize_delete_step(tenant_cell.clone(), tenant_repository.clone()),
    ];

    TenantWorkflow::new(
        "tenant.delete",
        steps,
        tenant_id,
        operation,
        operation_repository,
        event_sink,
        workflow_timeout,
    )
    .into_workflow()
}

/// Implements the wrapper protocol (§4.2) around a plain `Workflow`: starts
/// the operation before running the engine, then reconciles the operation
/// record with the engine's result before re-posting it on its own channel.
struct TenantWorkflow {
    engine: Workflow,
    tenant_id: TenantId,
    operation: Operation,
    operation_repository: Arc<dyn OperationRepository>,
    event_sink: Arc<dyn EventSink>,
    workflow_timeout: Option<Duration>,
}

impl TenantWorkflow {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: &str,
        steps: Vec<Step>,
        tenant_id: TenantId,
        operation: Operation,
        operation_repository: Arc<dyn OperationRepository>,
        event_sink: Arc<dyn EventSink>,
        workflow_timeout: Option<Duration>,
    ) -> Self {
        Self {
            engine: Workflow::new(name, steps, workflow_timeout, event_sink.clone()),
            tenant_id,
            operation,
            operation_repository,
            event_sink,
            workflow_timeout,
        }
    }

    /// Wraps `engine` in a `Workflow`-shaped facade that runs the wrapper
    /// protocol on `start`/`result`. Implemented as an adapter workflow whose
    /// single step drives the real engine end to end and republishes its
    /// reconciled result, so `TenantService` only ever talks to the plain
    /// `Workflow` contract.
    fn into_workflow(self) -> Workflow {
        let Self { engine, tenant_id, operation, operation_repository, event_sink, workflow_timeout } = self;
        let engine = Arc::new(engine);
        let operation = Arc::new(Mutex::new(operation));
        let outer_sink = event_sink.clone();

        let wrapper_step = Step::new(
            engine.name.clone(),
            "start operation, run steps, reconcile result",
            move |ctx| -> StepFuture {
                let engine = engine.clone();
                let operation = operation.clone();
                let operation_repository = operation_repository.clone();
                let event_sink = event_sink.clone();
                let tenant_id = tenant_id;
                Box::pin(async move {
                    // Step 1 of the wrapper protocol.
                    let operation_id = {
                        let mut op = operation.lock().unwrap().clone();
                        if op.start().is_err() {
                            return Err(format!("tenant {}: operation already started", tenant_id.0));
                        }
                        if operation_repository.update(&op).await.is_err() {
                            return Err(format!(
                                "tenant {}: failed to persist operation start, steps not run",
                                tenant_id.0
                            ));
                        }
                        let id = op.id;
                        *operation.lock().unwrap() = op;
                        id
                    };
                    event_sink.emit(Event::OperationCreated {
                        operation_id,
                        operation_type: engine.name.clone(),
                    });

                    // Step 2: run the engine's own step sequence.
                    engine.start(operation_id, ctx.cancellation.clone());
                    let engine_result = engine.result().await.map_err(|e| e.to_string())?;

                    // Step 3: augment the result map with the tenant id.
                    let mut result = engine_result.result.clone();
                    result.insert("tenant_id".to_string(), Value::from(tenant_id.0));

                    // Step 4: reconcile the operation with the engine's outcome.
                    let mut op = operation.lock().unwrap().clone();
                    let reconciled = if engine_result.success {
                        op.complete(result.clone())
                    } else {
                        op.fail(engine_result.error.clone().unwrap_or_default())
                    };
                    if let Err(e) = reconciled {
                        tracing::warn!(error = %e, "operation transition rejected during reconciliation");
                    }
                    // A persist error here is recorded but does not override
                    // the already-computed result (§4.2 step 4).
                    if let Err(e) = operation_repository.update(&op).await {
                        tracing::warn!(error = %e, "failed to persist reconciled operation");
                    }
                    *operation.lock().unwrap() = op;

                    if engine_result.success {
                        Ok(())
                    } else {
                        Err(engine_result.error.unwrap_or_else(|| "workflow failed".to_string()))
                    }
                })
            },
        );

        Workflow::new(wrapper_step.name.clone(), vec![wrapper_step], workflow_timeout, outer_sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingEventSink;
    use crate::operation::{OperationStatus, OperationType};
    use crate::storage::{InMemoryOperationRepository, InMemoryTenantRepository};
    use crate::tenant::{Region, TenantStatus, Tier};

    async fn setup_create() -> (Arc<dyn TenantRepository>, Arc<dyn OperationRepository>, TenantId, OperationId) {
        let tenant_repo = InMemoryTenantRepository::new();
        let op_repo = InMemoryOperationRepository::new();
        let tenant = Tenant::new("acme", Region::Eu1, Tier::Pro, None).unwrap();
        let tenant_id = tenant_repo.create(tenant).await.unwrap();
        let operation = Operation::new(OperationType::TenantCreate, Some(tenant_id), HashMap::new(), None);
        let operation_id = op_repo.create(operation).await.unwrap();
        (tenant_repo, op_repo, tenant_id, operation_id)
    }

    #[tokio::test]
    async fn successful_create_activates_tenant_and_completes_operation() {
        let (tenant_repo, op_repo, tenant_id, operation_id) = setup_create().await;
        let tenant = tenant_repo.find_by_id(tenant_id).await.unwrap();
        let operation = op_repo.find_by_id(operation_id).await.unwrap();

        let workflow = build_create_workflow(
            tenant,
            operation,
            tenant_repo.clone(),
            op_repo.clone(),
            Arc::new(TracingEventSink),
            None,
        );
        workflow.start(operation_id, CancellationToken::new());
        let result = workflow.result().await.unwrap();
        assert!(result.success);

        let tenant_after = tenant_repo.find_by_id(tenant_id).await.unwrap();
        assert_eq!(tenant_after.status, TenantStatus::Active);

        let operation_after = op_repo.find_by_id(operation_id).await.unwrap();
        assert_eq!(operation_after.status, OperationStatus::Completed);
        assert_eq!(operation_after.result.get("tenant_id").unwrap(), &Value::from(tenant_id.0));
    }

    #[tokio::test]
    async fn successful_delete_marks_tenant_deleted() {
        let tenant_repo = InMemoryTenantRepository::new();
        let op_repo = InMemoryOperationRepository::new();
        let mut tenant = Tenant::new("acme", Region::Us1, Tier::Free, None).unwrap();
        tenant.activate().unwrap();
        let tenant_id = tenant_repo.create(tenant).await.unwrap();
        let operation = Operation::new(OperationType::TenantDelete, Some(tenant_id), HashMap::new(), None);
        let operation_id = op_repo.create(operation).await.unwrap();

        let tenant = tenant_repo.find_by_id(tenant_id).await.unwrap();
        let operation = op_repo.find_by_id(operation_id).await.unwrap();
        let workflow = build_delete_workflow(
            tenant,
            operation,
            tenant_repo.clone(),
            op_repo.clone(),
            Arc::new(TracingEventSink),
            None,
        );
        workflow.start(operation_id, CancellationToken::new());
        let result = workflow.result().await.unwrap();
        assert!(result.success);

        let tenant_after = tenant_repo.find_by_id(tenant_id).await.unwrap();
        assert_eq!(tenant_after.status, TenantStatus::Deleted);

        let operation_after = op_repo.find_by_id(operation_id).await.unwrap();
        assert_eq!(operation_after.status, OperationStatus::Completed);
    }
}
