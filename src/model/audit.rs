//! System-wide compliance audit records.
//!
//! Audit rows are independent of the business rows they reference: deleting
//! an order never touches its audit trail, and rows are only purgeable after
//! their fixed retention window.

use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use super::{Role, UnknownVariant};

/// Regulatory retention for audit rows, fixed at creation.
pub const AUDIT_RETENTION_YEARS: u32 = 7;

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Convert,
    Decide,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Read => "READ",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Convert => "CONVERT",
            AuditAction::Decide => "DECIDE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "CREATE" => Ok(AuditAction::Create),
            "READ" => Ok(AuditAction::Read),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            "CONVERT" => Ok(AuditAction::Convert),
            "DECIDE" => Ok(AuditAction::Decide),
            other => Err(UnknownVariant {
                kind: "audit action",
                value: other.to_string(),
            }),
        }
    }
}

/// Resource types the audit log covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AuditResource {
    Quote,
    Order,
    Proof,
    Practice,
    User,
}

impl AuditResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResource::Quote => "QUOTE",
            AuditResource::Order => "ORDER",
            AuditResource::Proof => "PROOF",
            AuditResource::Practice => "PRACTICE",
            AuditResource::User => "USER",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "QUOTE" => Ok(AuditResource::Quote),
            "ORDER" => Ok(AuditResource::Order),
            "PROOF" => Ok(AuditResource::Proof),
            "PRACTICE" => Ok(AuditResource::Practice),
            "USER" => Ok(AuditResource::User),
            other => Err(UnknownVariant {
                kind: "audit resource",
                value: other.to_string(),
            }),
        }
    }
}

/// Severity of an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "INFO",
            AuditSeverity::Warning => "WARNING",
            AuditSeverity::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "INFO" => Ok(AuditSeverity::Info),
            "WARNING" => Ok(AuditSeverity::Warning),
            "CRITICAL" => Ok(AuditSeverity::Critical),
            other => Err(UnknownVariant {
                kind: "audit severity",
                value: other.to_string(),
            }),
        }
    }
}

/// One append-only audit row.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: Role,
    /// Practice context of the action; None for superuser-wide actions.
    pub practice_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource: AuditResource,
    pub resource_id: Uuid,
    pub severity: AuditSeverity,
    /// Whether the row's detail may carry protected health information.
    pub contains_phi: bool,
    /// False for attempts rejected by business rules; those stay auditable.
    pub success: bool,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Purge floor, fixed at creation. Never recomputed.
    pub retain_until: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record stamped now, with retention derived from `created_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor: &super::CallerScope,
        action: AuditAction,
        resource: AuditResource,
        resource_id: Uuid,
        severity: AuditSeverity,
        success: bool,
        detail: Option<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            actor_id: actor.user_id,
            actor_role: actor.role,
            practice_id: actor.practice_id,
            action,
            resource,
            resource_id,
            severity,
            contains_phi: false,
            success,
            detail,
            created_at,
            // Calendar years, not 365-day years: the floor must not slip
            // backwards across leap days.
            retain_until: created_at + Months::new(12 * AUDIT_RETENTION_YEARS),
        }
    }

    /// Mark the record as carrying PHI in its detail.
    pub fn with_phi(mut self) -> Self {
        self.contains_phi = true;
        self
    }
}

/// Filter for audit-trail queries. Empty fields match everything the caller
/// is allowed to see.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub resource: Option<AuditResource>,
    pub resource_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::model::CallerScope;

    #[test]
    fn test_retention_is_seven_calendar_years_from_creation() {
        let scope = CallerScope::superuser(Uuid::new_v4());
        let record = AuditRecord::new(
            &scope,
            AuditAction::Update,
            AuditResource::Order,
            Uuid::new_v4(),
            AuditSeverity::Info,
            true,
            None,
        );
        assert_eq!(record.retain_until, record.created_at + Months::new(84));
        // Any 7-calendar-year span contains at least one leap day, so the
        // window is always longer than 7 * 365 days.
        assert!(record.retain_until - record.created_at > Duration::days(365 * 7));
    }

    #[test]
    fn test_phi_flag_defaults_off() {
        let scope = CallerScope::superuser(Uuid::new_v4());
        let record = AuditRecord::new(
            &scope,
            AuditAction::Read,
            AuditResource::Proof,
            Uuid::new_v4(),
            AuditSeverity::Info,
            true,
            None,
        );
        assert!(!record.contains_phi);
        assert!(record.with_phi().contains_phi);
    }
}
