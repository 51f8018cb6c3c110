use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::domain::{InvitationDraft, InvitationId, UserInvitation};
use super::repository::{HashError, InvitationRepository, PasswordHasher, TOKEN_CONFLICT};
use super::token::{encode_token, OsTokenSource, TokenSource, TOKEN_BYTES};
use super::validation::{validate_draft, validate_password};
use crate::clock::{Clock, SystemClock};
use crate::error::ErrorKind;
use crate::workflows::notifications::{
    dispatch_best_effort, Notification, NotificationDispatcher,
};
use crate::workflows::people::{
    normalize_email, Actor, Role, User, UserDirectory, UserId, UserStatus,
};
use crate::workflows::store::RepositoryError;

pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 24;
/// Ten years.
pub const MAX_INVITATION_TTL_HOURS: i64 = 24 * 365 * 10;
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_MAX_TOKEN_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationSettings {
    pub ttl: Duration,
    pub frontend_url: String,
    pub min_password_length: usize,
    /// Token draws before giving up on finding an unused value.
    pub max_token_attempts: u32,
}

impl InvitationSettings {
    /// Expiry of a token issued at `now`, or `None` when the window leaves the calendar range.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_add_signed(self.ttl)
    }

    pub fn link_for(&self, token: &str) -> String {
        format!(
            "{}/set-password/{}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(DEFAULT_INVITATION_TTL_HOURS),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            max_token_attempts: DEFAULT_MAX_TOKEN_ATTEMPTS,
        }
    }
}

/// Owns the invitation state machine: issue, complete, renew.
pub struct InvitationManager<I, U, N> {
    invitations: Arc<I>,
    directory: Arc<U>,
    dispatcher: Arc<N>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    settings: InvitationSettings,
}

impl<I, U, N> InvitationManager<I, U, N>
where
    I: InvitationRepository + 'static,
    U: UserDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        invitations: Arc<I>,
        directory: Arc<U>,
        dispatcher: Arc<N>,
        hasher: Arc<dyn PasswordHasher>,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            invitations,
            directory,
            dispatcher,
            hasher,
            tokens: Arc::new(OsTokenSource),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn settings(&self) -> &InvitationSettings {
        &self.settings
    }

    /// Invite a new account holder. Only admins may invite, and only one unused invitation
    /// may exist per e-mail, even when that invitation has already expired.
    pub fn issue(
        &self,
        actor: &Actor,
        draft: InvitationDraft,
    ) -> Result<UserInvitation, InvitationError> {
        require_admin(actor)?;
        validate_draft(&draft)?;

        let email = normalize_email(&draft.email);
        if self.directory.find_user_by_email(&email)?.is_some() {
            return Err(InvitationError::UserExists(email));
        }
        if self.invitations.find_unused_by_email(&email)?.is_some() {
            return Err(InvitationError::PendingInvitation(email));
        }

        let now = self.clock.now();
        let invitation = UserInvitation {
            id: InvitationId::new(),
            email,
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            token: String::new(),
            role: draft.role,
            department: draft.department,
            expiry_date: self.expiry_from(now)?,
            used: false,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let stored = self.store_with_fresh_token(invitation, |candidate| {
            self.invitations.insert_invitation(candidate)
        })?;

        info!(
            invitation_id = %stored.id,
            invited_by = %actor.user_id,
            role = stored.role.label(),
            expires_at = %stored.expiry_date,
            "invitation issued"
        );

        self.notify(&stored);
        Ok(stored)
    }

    /// Redeem a token: the invited user is created and the invitation consumed in one write.
    pub fn complete(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, InvitationError> {
        validate_password(password, confirm_password, self.settings.min_password_length)?;

        let mut invitation = self
            .invitations
            .find_by_token(token)?
            .ok_or(InvitationError::InvitationNotFound)?;
        if invitation.used {
            return Err(InvitationError::AlreadyUsed);
        }
        let now = self.clock.now();
        if invitation.is_expired(now) {
            return Err(InvitationError::Expired {
                expired_at: invitation.expiry_date,
            });
        }

        let password_hash = self.hasher.hash_password(password)?;
        let user = User {
            id: UserId::new(),
            email: invitation.email.clone(),
            first_name: invitation.first_name.clone(),
            last_name: invitation.last_name.clone(),
            password_hash,
            role: invitation.role,
            department: invitation.department,
            status: UserStatus::Approved,
            created_at: now,
            updated_at: now,
        };
        invitation.used = true;
        invitation.updated_at = now;
        let invitation_id = invitation.id;
        let user = self.invitations.redeem(invitation, user)?;

        info!(
            invitation_id = %invitation_id,
            user_id = %user.id,
            role = user.role.label(),
            "invitation completed"
        );
        Ok(user)
    }

    /// Replace the token of an expired, unused invitation and restart its validity window.
    pub fn renew(&self, email: &str) -> Result<UserInvitation, InvitationError> {
        let email = normalize_email(email);
        let mut invitation = self
            .invitations
            .find_unused_by_email(&email)?
            .ok_or_else(|| InvitationError::NoPendingInvitation(email.clone()))?;

        let now = self.clock.now();
        if invitation.expiry_date > now {
            return Err(InvitationError::StillValid {
                expires_at: invitation.expiry_date,
            });
        }

        invitation.expiry_date = self.expiry_from(now)?;
        invitation.updated_at = now;
        let stored = self.store_with_fresh_token(invitation, |candidate| {
            self.invitations.update_invitation(candidate)
        })?;

        info!(
            invitation_id = %stored.id,
            expires_at = %stored.expiry_date,
            "invitation renewed"
        );

        self.notify(&stored);
        Ok(stored)
    }

    pub fn list(&self, actor: &Actor) -> Result<Vec<UserInvitation>, InvitationError> {
        require_admin(actor)?;
        Ok(self.invitations.list_invitations()?)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, InvitationError> {
        self.settings
            .expiry_from(now)
            .ok_or(InvitationError::ExpiryOutOfRange {
                ttl: self.settings.ttl,
            })
    }

    /// Draw tokens until `write` stores one. A token taken between the existence check and
    /// the write is redrawn like any other collision.
    fn store_with_fresh_token<F>(
        &self,
        invitation: UserInvitation,
        write: F,
    ) -> Result<UserInvitation, InvitationError>
    where
        F: Fn(UserInvitation) -> Result<UserInvitation, RepositoryError>,
    {
        let attempts = self.settings.max_token_attempts.max(1);
        for attempt in 1..=attempts {
            let token = encode_token(&self.tokens.random_bytes(TOKEN_BYTES));
            if self.invitations.token_exists(&token)? {
                debug!(attempt, "invitation token collision; regenerating");
                continue;
            }
            let candidate = UserInvitation {
                token,
                ..invitation.clone()
            };
            match write(candidate) {
                Err(RepositoryError::Conflict(detail)) if detail == TOKEN_CONFLICT => {
                    debug!(attempt, "invitation token claimed concurrently; regenerating");
                }
                result => return Ok(result?),
            }
        }
        Err(InvitationError::TokenExhausted { attempts })
    }

    fn notify(&self, invitation: &UserInvitation) {
        let link = self.settings.link_for(&invitation.token);
        let notification = Notification::invitation_issued(invitation.clone(), link);
        dispatch_best_effort(self.dispatcher.as_ref(), notification);
    }
}

fn require_admin(actor: &Actor) -> Result<(), InvitationError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(InvitationError::NotAdmin { role: actor.role })
    }
}

/// Error raised by the invitation manager.
#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("role {role} is not allowed to manage invitations")]
    NotAdmin { role: Role },
    #[error("invalid e-mail address: {0}")]
    InvalidEmail(String),
    #[error("{0} is required")]
    MissingName(&'static str),
    #[error("a user with e-mail {0} already exists")]
    UserExists(String),
    #[error("an invitation has already been sent to {0}")]
    PendingInvitation(String),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min_length} characters long")]
    PasswordTooShort { min_length: usize },
    #[error("invalid or unknown invitation token")]
    InvitationNotFound,
    #[error("no pending invitation found for {0}")]
    NoPendingInvitation(String),
    #[error("this invitation has already been used")]
    AlreadyUsed,
    #[error("this invitation expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
    #[error("invitation is still valid and does not need renewal (expires at {expires_at})")]
    StillValid { expires_at: DateTime<Utc> },
    #[error("an invitation lifetime of {ttl} runs past the supported calendar range")]
    ExpiryOutOfRange { ttl: Duration },
    #[error("could not generate an unused invitation token after {attempts} attempts")]
    TokenExhausted { attempts: u32 },
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl InvitationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvitationError::NotAdmin { .. } => ErrorKind::Forbidden,
            InvitationError::InvalidEmail(_)
            | InvitationError::MissingName(_)
            | InvitationError::PasswordMismatch
            | InvitationError::PasswordTooShort { .. }
            | InvitationError::StillValid { .. }
            | InvitationError::ExpiryOutOfRange { .. } => ErrorKind::Validation,
            InvitationError::UserExists(_)
            | InvitationError::PendingInvitation(_)
            | InvitationError::AlreadyUsed => ErrorKind::Conflict,
            InvitationError::InvitationNotFound | InvitationError::NoPendingInvitation(_) => {
                ErrorKind::NotFound
            }
            InvitationError::Expired { .. } => ErrorKind::Expired,
            InvitationError::TokenExhausted { .. } | InvitationError::Hash(_) => {
                ErrorKind::Unavailable
            }
            InvitationError::Repository(error) => error.kind(),
        }
    }
}
