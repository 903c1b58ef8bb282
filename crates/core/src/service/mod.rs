mod operation_service;
mod registry;
mod tenant_service;

pub use operation_service::{OperationService, OperationServiceError};
pub use registry::WorkflowRegistry;
pub use tenant_service::{CreateTenantParams, TenantService, TenantServiceError};
