use crate::events::EventSink;
use crate::operation::{Operation, OperationType};
use crate::repository::{OperationRepository, TenantRepository};
use crate::tenant::Tenant;
use crate::workflow::engine::Workflow;
use crate::workflow::tenant_workflows::{build_create_workflow, build_delete_workflow};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowFactoryError {
    #[error("no workflow registered for operation type '{0}'")]
    UnknownOperationType(String),
}

/// Dispatches an operation type to the workflow that fulfills it. Owns the
/// dependency wiring (repositories, event sink, timeout policy) so the
/// service layer never constructs a workflow directly.
pub struct WorkflowFactory {
    tenant_repository: Arc<dyn TenantRepository>,
    operation_repository: Arc<dyn OperationRepository>,
    event_sink: Arc<dyn EventSink>,
    workflow_timeout: Option<Duration>,
}

impl WorkflowFactory {
    pub fn new(
        tenant_repository: Arc<dyn TenantRepository>,
        operation_repository: Arc<dyn OperationRepository>,
        event_sink: Arc<dyn EventSink>,
        workflow_timeout: Option<Duration>,
    ) -> Self {
        Self { tenant_repository, operation_repository, event_sink, workflow_timeout }
    }

    /// `OperationType` is a closed, exhaustively-matched enum, so this never
    /// actually returns `UnknownOperationType` today; the variant stays part
    /// of the public error surface for callers that resolve the type from an
    /// untyped source (e.g. a string column) before calling in here.
    pub fn build(
        &self,
        operation_type: OperationType,
        tenant: Tenant,
        operation: Operation,
    ) -> Result<Workflow, WorkflowFactoryError> {
        match operation_type {
            OperationType::TenantCreate => Ok(build_create_workflow(
                tenant,
                operation,
                self.tenant_repository.clone(),
                self.operation_repository.clone(),
                self.event_sink.clone(),
                self.workflow_timeout,
            )),
            OperationType::TenantDelete => Ok(build_delete_workflow(
                tenant,
                operation,
                self.tenant_repository.clone(),
                self.operation_repository.clone(),
                self.event_sink.clone(),
                self.workflow_timeout,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingEventSink;
    use crate::storage::{InMemoryOperationRepository, InMemoryTenantRepository};
    use crate::tenant::{Region, Tier};
    use std::collections::HashMap;

    #[test]
    fn build_dispatches_on_operation_type() {
        let factory = WorkflowFactory::new(
            InMemoryTenantRepository::new(),
            InMemoryOperationRepository::new(),
            Arc::new(TracingEventSink),
            None,
        );
        let tenant = Tenant::new("acme", Region::Us1, Tier::Free, None).unwrap();
        let operation = Operation::new(OperationType::TenantCreate, None, HashMap::new(), None);
        assert!(factory.build(OperationType::TenantCreate, tenant.clone(), operation.clone()).is_ok());
        assert!(factory.build(OperationType::TenantDelete, tenant, operation).is_ok());
    }
}
