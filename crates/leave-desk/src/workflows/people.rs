//! Users, roles, and the caller identity passed into every guarded operation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Department reference. Departments themselves are managed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepartmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Staff,
    Manager,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    /// Managers and admins may approve, reject, and record leave for others.
    pub const fn is_approver(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub department: Option<DepartmentId>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Caller identity resolved by the boundary layer before invoking a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn of(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Lower-cased, trimmed form used for every e-mail comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Read access to user accounts plus the single insert used by onboarding.
pub trait UserDirectory: Send + Sync {
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError>;
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
}
