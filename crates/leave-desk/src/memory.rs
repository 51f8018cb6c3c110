//! Mutex-guarded maps implementing every repository trait, for demos and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::workflows::leave::{LeaveId, LeaveQuery, LeaveRepository, LeaveRequest};
use crate::workflows::onboarding::{
    InvitationId, InvitationRepository, UserInvitation, TOKEN_CONFLICT,
};
use crate::workflows::people::{normalize_email, Role, User, UserDirectory, UserId};
use crate::workflows::store::RepositoryError;

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    leaves: HashMap<LeaveId, LeaveRequest>,
    invitations: HashMap<InvitationId, UserInvitation>,
}

impl StoreState {
    fn email_taken(&self, email: &str) -> bool {
        self.users
            .values()
            .any(|user| normalize_email(&user.email) == email)
    }

    fn insert_user(&mut self, user: User) -> Result<User, RepositoryError> {
        if self.users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user {}", user.id)));
        }
        if self.email_taken(&normalize_email(&user.email)) {
            return Err(RepositoryError::Conflict(format!("user e-mail {}", user.email)));
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Shared handle; clones see the same data.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store mutex poisoned")
    }
}

impl LeaveRepository for InMemoryStore {
    fn insert_leave(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        let mut guard = self.lock();
        if guard.leaves.contains_key(&record.id()) {
            return Err(RepositoryError::Conflict(format!("leave {}", record.id())));
        }
        guard.leaves.insert(record.id(), record.clone());
        Ok(record)
    }

    fn update_leave(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        let mut guard = self.lock();
        let current = guard
            .leaves
            .get(&record.id())
            .ok_or(RepositoryError::NotFound)?;
        if current.version() != record.version() {
            return Err(RepositoryError::StaleVersion {
                expected: record.version(),
                found: current.version(),
            });
        }
        let stored = record.revised();
        guard.leaves.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    fn fetch_leave(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Ok(self.lock().leaves.get(id).cloned())
    }

    fn delete_leave(&self, id: &LeaveId) -> Result<(), RepositoryError> {
        self.lock()
            .leaves
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn query_leaves(&self, query: &LeaveQuery) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let guard = self.lock();
        let mut matches: Vec<LeaveRequest> = guard
            .leaves
            .values()
            .filter(|record| {
                let department = guard
                    .users
                    .get(&record.requester())
                    .and_then(|user| user.department);
                query.matches(record, department)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(matches)
    }
}

impl UserDirectory for InMemoryStore {
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = normalize_email(email);
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| normalize_email(&user.email) == email)
            .cloned())
    }

    fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self
            .lock()
            .users
            .values()
            .filter(|user| roles.contains(&user.role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.lock().insert_user(user)
    }
}

impl InvitationRepository for InMemoryStore {
    fn insert_invitation(
        &self,
        invitation: UserInvitation,
    ) -> Result<UserInvitation, RepositoryError> {
        let mut guard = self.lock();
        if guard.invitations.contains_key(&invitation.id) {
            return Err(RepositoryError::Conflict(format!(
                "invitation {}",
                invitation.id
            )));
        }
        if guard
            .invitations
            .values()
            .any(|existing| existing.token == invitation.token)
        {
            return Err(RepositoryError::Conflict(TOKEN_CONFLICT.to_string()));
        }
        guard.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    fn update_invitation(
        &self,
        invitation: UserInvitation,
    ) -> Result<UserInvitation, RepositoryError> {
        let mut guard = self.lock();
        let current = guard
            .invitations
            .get(&invitation.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != invitation.version {
            return Err(RepositoryError::StaleVersion {
                expected: invitation.version,
                found: current.version,
            });
        }
        if guard
            .invitations
            .values()
            .any(|existing| existing.id != invitation.id && existing.token == invitation.token)
        {
            return Err(RepositoryError::Conflict(TOKEN_CONFLICT.to_string()));
        }
        let stored = invitation.revised();
        guard.invitations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn find_by_token(&self, token: &str) -> Result<Option<UserInvitation>, RepositoryError> {
        Ok(self
            .lock()
            .invitations
            .values()
            .find(|invitation| invitation.token == token)
            .cloned())
    }

    fn find_unused_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserInvitation>, RepositoryError> {
        let email = normalize_email(email);
        Ok(self
            .lock()
            .invitations
            .values()
            .filter(|invitation| !invitation.used && invitation.email == email)
            .max_by_key(|invitation| invitation.created_at)
            .cloned())
    }

    fn token_exists(&self, token: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .invitations
            .values()
            .any(|invitation| invitation.token == token))
    }

    fn list_invitations(&self) -> Result<Vec<UserInvitation>, RepositoryError> {
        let mut invitations: Vec<UserInvitation> =
            self.lock().invitations.values().cloned().collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    fn redeem(&self, invitation: UserInvitation, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.lock();
        let current = guard
            .invitations
            .get(&invitation.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.used {
            return Err(RepositoryError::Conflict(format!(
                "invitation {} already redeemed",
                invitation.id
            )));
        }
        if current.version != invitation.version {
            return Err(RepositoryError::StaleVersion {
                expected: invitation.version,
                found: current.version,
            });
        }

        // Both checks above run before either write, so a failed insert leaves no trace.
        let user = guard.insert_user(user)?;
        let stored = invitation.revised();
        guard.invitations.insert(stored.id, stored);
        Ok(user)
    }
}
