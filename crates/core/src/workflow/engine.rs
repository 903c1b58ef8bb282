use crate::events::{Event, EventSink};
use crate::operation::OperationId;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WORKFLOW_TIMEOUT: StdDuration = StdDuration::from_secs(5 * 60);

/// Context handed to a step body: deadline + cancellation, nothing else.
#[derive(Clone)]
pub struct StepContext {
    pub deadline: tokio::time::Instant,
    pub cancellation: CancellationToken,
}

pub type StepFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
pub type StepBody = Arc<dyn Fn(StepContext) -> StepFuture + Send + Sync>;

/// One named unit of work in a workflow.
#[derive(Clone)]
pub struct Step {
    pub name: String,
    pub description: String,
    pub body: StepBody,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        body: impl Fn(StepContext) -> StepFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            body: Arc::new(body),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub success: bool,
    pub error: Option<String>,
    pub result: HashMap<String, Value>,
    pub steps: Vec<StepOutcome>,
}

/// Ordered, finite sequence of named steps executed strictly in declaration
/// order. At most one step body runs at a time; failure of step `k` stops the
/// sequence before `k+1`.
pub struct Workflow {
    pub name: String,
    steps: Vec<Step>,
    timeout: StdDuration,
    event_sink: Arc<dyn EventSink>,
    result_rx: Mutex<Option<oneshot::Receiver<WorkflowResult>>>,
}

impl Workflow {
    pub fn new(
        name: impl Into<String>,
        steps: Vec<Step>,
        timeout_override: Option<StdDuration>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let timeout = match timeout_override {
            Some(d) if !d.is_zero() => d,
            _ => DEFAULT_WORKFLOW_TIMEOUT,
        };
        Self {
            name: name.into(),
            steps,
            timeout,
            event_sink,
            result_rx: Mutex::new(None),
        }
    }

    /// Fire-and-return: schedules execution on a separate task bounded by the
    /// workflow's timeout and does not block the caller.
    pub fn start(&self, operation_id: OperationId, cancellation: CancellationToken) {
        let (tx, rx) = oneshot::channel();
        *self.result_rx.lock().unwrap() = Some(rx);

        let steps = self.steps.clone();
        let timeout = self.timeout;
        let event_sink = self.event_sink.clone();

        tokio::spawn(async move {
            let result = run_steps(operation_id, steps, timeout, cancellation, event_sink.clone()).await;
            if result.success {
                event_sink.emit(Event::WorkflowCompleted { operation_id });
            } else {
                event_sink.emit(Event::WorkflowFailed {
                    operation_id,
                    error: result.error.clone().unwrap_or_default(),
                });
            }
            // The receiver may have been dropped; that's fine, nobody's listening.
            let _ = tx.send(result);
        });
    }

    /// Returns the one-shot receiver for this run. Must be called after `start`.
    pub fn result(&self) -> oneshot::Receiver<WorkflowResult> {
        self.result_rx
            .lock()
            .unwrap()
            .take()
            .expect("Workflow::result called before Workflow::start")
    }
}

async fn run_steps(
    operation_id: OperationId,
    steps: Vec<Step>,
    timeout: StdDuration,
    cancellation: CancellationToken,
    event_sink: Arc<dyn EventSink>,
) -> WorkflowResult {
    if cancellation.is_cancelled() {
        return WorkflowResult {
            success: false,
            error: Some("cancelled before start".to_string()),
            result: HashMap::new(),
            steps: Vec::new(),
        };
    }

    let deadline = tokio::time::Instant::now() + timeout;
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        let ctx = StepContext { deadline, cancellation: cancellation.clone() };
        let started_at = Utc::now();
        event_sink.emit(Event::WorkflowStepStarted { operation_id, step: step.name.clone() });

        let body = step.body.clone();
        let mut task = tokio::spawn(async move { (body)(ctx).await });

        let outcome = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                task.abort();
                step_failure(step.name, started_at, "cancelled".to_string())
            }
            _ = tokio::time::sleep_until(deadline) => {
                task.abort();
                step_failure(step.name, started_at, "deadline exceeded".to_string())
            }
            joined = &mut task => {
                match joined {
                    Ok(Ok(())) => step_success(step.name, started_at),
                    Ok(Err(cause)) => step_failure(step.name, started_at, cause),
                    Err(join_err) => step_failure(step.name, started_at, join_err.to_string()),
                }
            }
        };

        let failed = !outcome.success;
        if failed {
            event_sink.emit(Event::WorkflowStepFailed {
                operation_id,
                step: outcome.name.clone(),
                error: outcome.error.clone().unwrap_or_default(),
                duration_ms: outcome.duration_ms,
            });
        } else {
            event_sink.emit(Event::WorkflowStepCompleted {
                operation_id,
                step: outcome.name.clone(),
                duration_ms: outcome.duration_ms,
            });
        }

        let step_name = outcome.name.clone();
        let step_error = outcome.error.clone();
        outcomes.push(outcome);

        if failed {
            return WorkflowResult {
                success: false,
                error: Some(format!("step {}: {}", step_name, step_error.unwrap_or_default())),
                result: HashMap::new(),
                steps: outcomes,
            };
        }
    }

    WorkflowResult { success: true, error: None, result: HashMap::new(), steps: outcomes }
}

fn step_success(name: String, started_at: DateTime<Utc>) -> StepOutcome {
    let completed_at = Utc::now();
    StepOutcome {
        name,
        started_at,
        completed_at,
        duration_ms: (completed_at - started_at).num_milliseconds(),
        success: true,
        error: None,
    }
}

fn step_failure(name: String, started_at: DateTime<Utc>, error: String) -> StepOutcome {
    let completed_at = Utc::now();
    StepOutcome {
        name,
        started_at,
        completed_at,
        duration_ms: (completed_at - started_at).num_milliseconds(),
        success: false,
        error: Some(error),
    }
}
