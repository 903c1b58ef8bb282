use crate::operation::OperationId;
use serde::{Deserialize, Serialize};

/// Lifecycle signals the engine emits as it drives operations and workflows.
/// Transport is deliberately unspecified (§1); `TracingEventSink` is the
/// default implementation, built on structured logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OperationCreated {
        operation_id: OperationId,
        operation_type: String,
    },
    WorkflowStepStarted {
        operation_id: OperationId,
        step: String,
    },
    WorkflowStepCompleted {
        operation_id: OperationId,
        step: String,
        duration_ms: i64,
    },
    WorkflowStepFailed {
        operation_id: OperationId,
        step: String,
        error: String,
        duration_ms: i64,
    },
    WorkflowCompleted {
        operation_id: OperationId,
    },
    WorkflowFailed {
        operation_id: OperationId,
        error: String,
    },
}

/// Abstract sink for lifecycle events. Implementations must never let a
/// telemetry failure change control flow in the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Default sink: routes every event through `tracing` at an appropriate level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        match &event {
            Event::WorkflowStepFailed { .. } | Event::WorkflowFailed { .. } => {
                tracing::warn!(?event, "workflow event");
            }
            _ => {
                tracing::info!(?event, "workflow event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Event>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn sink_records_events_in_order() {
        let sink = Arc::new(RecordingSink::default());
        sink.emit(Event::OperationCreated {
            operation_id: OperationId(1),
            operation_type: "tenant.create".to_string(),
        });
        sink.emit(Event::WorkflowCompleted { operation_id: OperationId(1) });
        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }
}
