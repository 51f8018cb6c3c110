use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::leave::{LeaveImportError, LeaveServiceError};
use crate::workflows::onboarding::InvitationError;
use serde::Serialize;
use std::fmt;

/// Failure categories a boundary layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    QuotaExceeded,
    Forbidden,
    InvalidState,
    NotFound,
    Conflict,
    Expired,
    Unavailable,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Expired => "EXPIRED",
            ErrorKind::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Import(LeaveImportError),
    Leave(LeaveServiceError),
    Invitation(InvitationError),
}

impl AppError {
    /// Domain category, when the failure came from a leave or invitation operation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Leave(err) => Some(err.kind()),
            AppError::Invitation(err) => Some(err.kind()),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Import(_) => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Leave(err) => write!(f, "leave error [{}]: {}", err.kind(), err),
            AppError::Invitation(err) => write!(f, "invitation error [{}]: {}", err.kind(), err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Leave(err) => Some(err),
            AppError::Invitation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<LeaveImportError> for AppError {
    fn from(value: LeaveImportError) -> Self {
        Self::Import(value)
    }
}

impl From<LeaveServiceError> for AppError {
    fn from(value: LeaveServiceError) -> Self {
        Self::Leave(value)
    }
}

impl From<InvitationError> for AppError {
    fn from(value: InvitationError) -> Self {
        Self::Invitation(value)
    }
}
