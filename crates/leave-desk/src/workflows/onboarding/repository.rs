use super::domain::UserInvitation;
use crate::workflows::people::User;
use crate::workflows::store::RepositoryError;

/// Conflict detail reported when a write would store a token another invitation already holds.
pub const TOKEN_CONFLICT: &str = "invitation token";

/// Storage for invitations.
///
/// `update_invitation` follows the same compare-and-swap contract as leave updates. Both
/// writes refuse a duplicate token with `RepositoryError::Conflict(TOKEN_CONFLICT)`. `redeem`
/// must insert the user and mark the invitation used as one write: when either half fails,
/// neither is visible.
pub trait InvitationRepository: Send + Sync {
    fn insert_invitation(&self, invitation: UserInvitation)
        -> Result<UserInvitation, RepositoryError>;
    fn update_invitation(&self, invitation: UserInvitation)
        -> Result<UserInvitation, RepositoryError>;
    fn find_by_token(&self, token: &str) -> Result<Option<UserInvitation>, RepositoryError>;
    /// Most recently created unused invitation for a normalized e-mail.
    fn find_unused_by_email(&self, email: &str)
        -> Result<Option<UserInvitation>, RepositoryError>;
    fn token_exists(&self, token: &str) -> Result<bool, RepositoryError>;
    /// Every invitation, newest first.
    fn list_invitations(&self) -> Result<Vec<UserInvitation>, RepositoryError>;
    fn redeem(&self, invitation: UserInvitation, user: User) -> Result<User, RepositoryError>;
}

/// Turns a raw password into the stored credential. The scheme belongs to the caller.
pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, raw: &str) -> Result<String, HashError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Backend(String),
}
