use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tenant, assigned by the repository on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of regions a tenant may be provisioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Us1,
    Us2,
    Us3,
    Us4,
    Eu1,
    Eu2,
    Eu3,
    Eu4,
}

impl Region {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "us1" => Some(Self::Us1),
            "us2" => Some(Self::Us2),
            "us3" => Some(Self::Us3),
            "us4" => Some(Self::Us4),
            "eu1" => Some(Self::Eu1),
            "eu2" => Some(Self::Eu2),
            "eu3" => Some(Self::Eu3),
            "eu4" => Some(Self::Eu4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us1 => "us1",
            Self::Us2 => "us2",
            Self::Us3 => "us3",
            Self::Us4 => "us4",
            Self::Eu1 => "eu1",
            Self::Eu2 => "eu2",
            Self::Eu3 => "eu3",
            Self::Eu4 => "eu4",
        }
    }
}

/// Closed set of service tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Default for Tier {
    fn default() -> Self {
        Self::Free
    }
}

impl Tier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

/// Tenant lifecycle status. `Error` and `Isolated` are reserved members of the
/// closed set; no transition in this crate produces them today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Provisioning,
    Active,
    Suspended,
    Deleting,
    Deleted,
    Error,
    Isolated,
}

impl TenantStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("validation failed for field '{field}': {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: TenantStatus, to: TenantStatus },
}

/// A customer's provisioned instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub region: Region,
    pub tier: Tier,
    pub status: TenantStatus,
    pub isolation_group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// `id` is `TenantId(0)` until the repository assigns a real one on create.
    pub fn new(
        name: impl Into<String>,
        region: Region,
        tier: Tier,
        isolation_group_id: Option<String>,
    ) -> Result<Self, TenantError> {
        let name = name.into();
        validate_name(&name)?;
        let now = Utc::now();
        Ok(Self {
            id: TenantId(0),
            name,
            region,
            tier,
            status: TenantStatus::Provisioning,
            isolation_group_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn transition(&mut self, to: TenantStatus) -> Result<(), TenantError> {
        let allowed = match (self.status, to) {
            (TenantStatus::Provisioning, TenantStatus::Active) => true,
            (TenantStatus::Provisioning, TenantStatus::Suspended) => true,
            (TenantStatus::Provisioning, TenantStatus::Deleting) => true,
            (TenantStatus::Active, TenantStatus::Suspended) => true,
            (TenantStatus::Active, TenantStatus::Deleting) => true,
            (TenantStatus::Suspended, TenantStatus::Active) => true,
            (TenantStatus::Suspended, TenantStatus::Deleting) => true,
            (TenantStatus::Deleting, TenantStatus::Deleted) => true,
            _ => false,
        };
        if !allowed {
            return Err(TenantError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.updated_at = Utc::now();
        if to == TenantStatus::Deleted {
            self.deleted_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// `finalize` step of the create workflow: `provisioning -> active`.
    pub fn activate(&mut self) -> Result<(), TenantError> {
        self.transition(TenantStatus::Active)
    }

    pub fn suspend(&mut self) -> Result<(), TenantError> {
        self.transition(TenantStatus::Suspended)
    }

    /// `deactivate` step of the delete workflow: marks the tenant as deleting.
    pub fn begin_deleting(&mut self) -> Result<(), TenantError> {
        self.transition(TenantStatus::Deleting)
    }

    /// `finalize` step of the delete workflow. Logical delete only; the row stays.
    pub fn finish_deleting(&mut self) -> Result<(), TenantError> {
        self.transition(TenantStatus::Deleted)
    }
}

/// `^[a-z0-9-]+$`, length 2-64.
fn validate_name(name: &str) -> Result<(), TenantError> {
    if name.len() < 2 || name.len() > 64 {
        return Err(TenantError::Validation {
            field: "name",
            reason: "must be between 2 and 64 characters".to_string(),
        });
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(TenantError::Validation {
            field: "name",
            reason: "must match ^[a-z0-9-]+$".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tenant() -> Tenant {
        Tenant::new("acme", Region::Eu1, Tier::Pro, None).unwrap()
    }

    #[test]
    fn new_tenant_is_provisioning() {
        let t = make_tenant();
        assert_eq!(t.status, TenantStatus::Provisioning);
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(Tenant::new("Bad Name", Region::Us1, Tier::Free, None).is_err());
        assert!(Tenant::new("a", Region::Us1, Tier::Free, None).is_err());
        assert!(Tenant::new("-".repeat(65), Region::Us1, Tier::Free, None).is_err());
    }

    #[test]
    fn accepts_boundary_length_names() {
        assert!(Tenant::new("ab", Region::Us1, Tier::Free, None).is_ok());
        assert!(Tenant::new("a".repeat(64), Region::Us1, Tier::Free, None).is_ok());
    }

    #[test]
    fn create_lifecycle_reaches_active() {
        let mut t = make_tenant();
        t.activate().unwrap();
        assert_eq!(t.status, TenantStatus::Active);
        assert!(t.deleted_at.is_none());
    }

    #[test]
    fn delete_lifecycle_reaches_deleted() {
        let mut t = make_tenant();
        t.activate().unwrap();
        t.begin_deleting().unwrap();
        assert_eq!(t.status, TenantStatus::Deleting);
        t.finish_deleting().unwrap();
        assert_eq!(t.status, TenantStatus::Deleted);
        assert!(t.status.is_terminal());
        assert!(t.deleted_at.is_some());
    }

    #[test]
    fn deleted_is_terminal_and_rejects_further_transitions() {
        let mut t = make_tenant();
        t.begin_deleting().unwrap();
        t.finish_deleting().unwrap();
        assert!(t.activate().is_err());
        assert!(t.begin_deleting().is_err());
    }

    #[test]
    fn region_and_tier_round_trip_through_strings() {
        assert_eq!(Region::parse("eu1").unwrap().as_str(), "eu1");
        assert!(Region::parse("mars1").is_none());
        assert_eq!(Tier::parse("enterprise").unwrap().as_str(), "enterprise");
        assert!(Tier::parse("bronze").is_none());
    }
}
