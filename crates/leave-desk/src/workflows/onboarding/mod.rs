mod domain;
mod repository;
mod service;
mod token;
mod validation;

#[cfg(test)]
mod tests;

pub use domain::{InvitationDraft, InvitationId, InvitationState, UserInvitation};
pub use repository::{HashError, InvitationRepository, PasswordHasher, TOKEN_CONFLICT};
pub use service::{
    InvitationError, InvitationManager, InvitationSettings, DEFAULT_FRONTEND_URL,
    DEFAULT_INVITATION_TTL_HOURS, DEFAULT_MIN_PASSWORD_LENGTH, MAX_INVITATION_TTL_HOURS,
};
pub use token::{encode_token, OsTokenSource, TokenSource, TOKEN_BYTES};
