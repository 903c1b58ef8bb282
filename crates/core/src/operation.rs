use crate::tenant::TenantId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub i64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of operation types, extensible as the provisioning surface grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[serde(rename = "tenant.create")]
    TenantCreate,
    #[serde(rename = "tenant.delete")]
    TenantDelete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenantCreate => "tenant.create",
            Self::TenantDelete => "tenant.delete",
        }
    }

    /// Budget used to derive an estimated completion time (§3).
    fn budget(&self) -> Duration {
        match self {
            Self::TenantCreate => Duration::minutes(5),
            Self::TenantDelete => Duration::minutes(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: OperationStatus, to: OperationStatus },
    #[error("operation is in a terminal state and has no defined progress")]
    NoProgress,
}

/// A durable record of an asynchronous provisioning intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub operation_type: OperationType,
    pub status: OperationStatus,
    pub tenant_id: Option<TenantId>,
    pub parameters: HashMap<String, Value>,
    pub result: HashMap<String, Value>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Operation {
    pub fn new(
        operation_type: OperationType,
        tenant_id: Option<TenantId>,
        parameters: HashMap<String, Value>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OperationId(0),
            operation_type,
            status: OperationStatus::Pending,
            tenant_id,
            parameters,
            result: HashMap::new(),
            error_message: None,
            created_by,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    fn ensure_transition(&self, to: OperationStatus) -> Result<(), OperationError> {
        let allowed = match (self.status, to) {
            (OperationStatus::Pending, OperationStatus::InProgress) => true,
            (OperationStatus::Pending, OperationStatus::Cancelled) => true,
            (OperationStatus::InProgress, OperationStatus::Completed) => true,
            (OperationStatus::InProgress, OperationStatus::Failed) => true,
            (OperationStatus::InProgress, OperationStatus::Cancelled) => true,
            _ => false,
        };
        if !allowed {
            return Err(OperationError::InvalidTransition { from: self.status, to });
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), OperationError> {
        self.ensure_transition(OperationStatus::InProgress)?;
        self.status = OperationStatus::InProgress;
        let now = Utc::now();
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn complete(&mut self, result: HashMap<String, Value>) -> Result<(), OperationError> {
        self.ensure_transition(OperationStatus::Completed)?;
        self.status = OperationStatus::Completed;
        self.result = result;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), OperationError> {
        self.ensure_transition(OperationStatus::Failed)?;
        self.status = OperationStatus::Failed;
        self.error_message = Some(message.into());
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), OperationError> {
        self.ensure_transition(OperationStatus::Cancelled)?;
        self.status = OperationStatus::Cancelled;
        self.error_message = Some(reason.into());
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// `completed_at - started_at`, if both are present.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// `(started_at or created_at) + type budget`, undefined once terminal.
    pub fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        if self.status.is_terminal() {
            return None;
        }
        let anchor = self.started_at.unwrap_or(self.created_at);
        Some(anchor + self.operation_type.budget())
    }

    /// Progress percentage per §3; terminal-non-completed is an error signal.
    pub fn progress(&self) -> Result<u8, OperationError> {
        match self.status {
            OperationStatus::Completed => Ok(100),
            OperationStatus::Failed | OperationStatus::Cancelled => Err(OperationError::NoProgress),
            OperationStatus::Pending => Ok(0),
            OperationStatus::InProgress => {
                let Some(started_at) = self.started_at else {
                    return Ok(5);
                };
                let elapsed = (Utc::now() - started_at).num_milliseconds().max(0) as f64;
                let total = self.operation_type.budget().num_milliseconds().max(1) as f64;
                let pct = (elapsed / total * 100.0).clamp(0.0, 99.0);
                Ok(pct as u8)
            }
        }
    }

    /// `true` iff `failed` AND not (delete AND result says the tenant was deleted).
    pub fn is_retryable(&self) -> bool {
        if self.status != OperationStatus::Failed {
            return false;
        }
        if self.operation_type == OperationType::TenantDelete {
            if let Some(Value::String(s)) = self.result.get("status") {
                if s == "deleted" {
                    return false;
                }
            }
        }
        true
    }
}
