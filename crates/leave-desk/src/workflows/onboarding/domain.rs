use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::people::{DepartmentId, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvitationId(pub Uuid);

impl InvitationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Details an admin supplies when inviting someone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationDraft {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<DepartmentId>,
}

/// Where an invitation sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationState {
    Active,
    Expired,
    Consumed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInvitation {
    pub id: InvitationId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub role: Role,
    pub department: Option<DepartmentId>,
    pub expiry_date: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl UserInvitation {
    /// Expired strictly after `expiry_date`; the expiry instant itself still redeems.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    pub fn state(&self, now: DateTime<Utc>) -> InvitationState {
        if self.used {
            InvitationState::Consumed
        } else if self.is_expired(now) {
            InvitationState::Expired
        } else {
            InvitationState::Active
        }
    }

    pub fn revised(mut self) -> Self {
        self.version += 1;
        self
    }
}
