pub mod engine;
pub mod factory;
pub mod tenant_workflows;

pub use engine::{Step, StepContext, StepFuture, Workflow, WorkflowResult, DEFAULT_WORKFLOW_TIMEOUT};
pub use factory::{WorkflowFactory, WorkflowFactoryError};
