// Core engine: tenant/operation domain model, workflow execution, and the
// service layer that wires them to a repository and an event sink.

pub mod events;
pub mod operation;
pub mod repository;
pub mod service;
pub mod storage;
pub mod tenant;
pub mod workflow;

pub use events::{Event, EventSink, TracingEventSink};
pub use operation::{Operation, OperationError, OperationId, OperationStatus, OperationType};
pub use repository::{OperationRepository, RepositoryError, TenantRepository};
pub use service::{CreateTenantParams, OperationService, TenantService, WorkflowRegistry};
pub use tenant::{Region, Tenant, TenantError, TenantId, TenantStatus, Tier};
