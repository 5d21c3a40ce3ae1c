//! Caller scope: the tenant + role context attached to every operation.

use uuid::Uuid;

use super::UnknownVariant;

/// Caller role within a practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    /// Practice administrator: manages orders and uploads proofs.
    Admin,
    /// Practice member: creates quotes, decides on proofs.
    User,
    /// Cross-tenant operator; the only role exempt from practice scoping.
    Superuser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Superuser => "SUPERUSER",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            "SUPERUSER" => Ok(Role::Superuser),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Resolved caller identity for one request-scoped unit of work.
///
/// Every repository call takes a scope; reads are filtered to the scope's
/// practice and writes against another practice's rows are rejected before
/// any business logic runs. Superusers carry no practice and see everything.
#[derive(Debug, Clone)]
pub struct CallerScope {
    pub user_id: Uuid,
    /// None only for superusers.
    pub practice_id: Option<Uuid>,
    pub role: Role,
}

impl CallerScope {
    /// Scope for a practice-bound caller.
    pub fn practice(user_id: Uuid, practice_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            practice_id: Some(practice_id),
            role,
        }
    }

    /// Cross-tenant superuser scope.
    pub fn superuser(user_id: Uuid) -> Self {
        Self {
            user_id,
            practice_id: None,
            role: Role::Superuser,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.role == Role::Superuser
    }

    /// Whether this scope may touch rows owned by `practice_id`.
    pub fn owns(&self, practice_id: Uuid) -> bool {
        self.is_superuser() || self.practice_id == Some(practice_id)
    }
}
