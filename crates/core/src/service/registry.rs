use crate::operation::OperationId;
use crate::workflow::engine::Workflow;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide registry of in-flight workflows, keyed by operation id.
///
/// Not the source of truth about operation state — the repository is. This
/// exists to keep a handle on every running workflow for cleanup once it
/// completes, and as a future hook for cancel/retry commands (§9).
#[derive(Default)]
pub struct WorkflowRegistry {
    live: RwLock<HashMap<OperationId, Arc<Workflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { live: RwLock::new(HashMap::new()) })
    }

    pub async fn register(&self, operation_id: OperationId, workflow: Arc<Workflow>) {
        self.live.write().await.insert(operation_id, workflow);
    }

    pub async fn deregister(&self, operation_id: OperationId) {
        self.live.write().await.remove(&operation_id);
    }

    pub async fn len(&self) -> usize {
        self.live.read().await.len()
    }
}
