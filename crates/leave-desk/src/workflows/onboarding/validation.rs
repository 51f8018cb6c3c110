use std::sync::OnceLock;

use regex::Regex;

use super::domain::InvitationDraft;
use super::service::InvitationError;
use crate::workflows::people::normalize_email;

pub(crate) fn validate_draft(draft: &InvitationDraft) -> Result<(), InvitationError> {
    validate_email(&normalize_email(&draft.email))?;
    if draft.first_name.trim().is_empty() {
        return Err(InvitationError::MissingName("first name"));
    }
    if draft.last_name.trim().is_empty() {
        return Err(InvitationError::MissingName("last name"));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), InvitationError> {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(InvitationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_password(
    password: &str,
    confirm_password: &str,
    min_length: usize,
) -> Result<(), InvitationError> {
    if password != confirm_password {
        return Err(InvitationError::PasswordMismatch);
    }
    if password.chars().count() < min_length {
        return Err(InvitationError::PasswordTooShort { min_length });
    }
    Ok(())
}
