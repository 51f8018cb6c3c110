use std::env;
use std::fmt;

use chrono::Duration;

use crate::workflows::leave::{LeavePolicy, DEFAULT_ANNUAL_PTO_LIMIT};
use crate::workflows::onboarding::{
    InvitationSettings, DEFAULT_FRONTEND_URL, DEFAULT_INVITATION_TTL_HOURS,
    DEFAULT_MIN_PASSWORD_LENGTH, MAX_INVITATION_TTL_HOURS,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub leave: LeavePolicy,
    pub invitations: InvitationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value)?,
            Err(_) => LogFormat::Compact,
        };

        let leave = LeavePolicy {
            annual_pto_limit: number_var("LEAVE_ANNUAL_PTO_LIMIT", DEFAULT_ANNUAL_PTO_LIMIT)?,
            allow_backdated: flag_var("LEAVE_ALLOW_BACKDATED", false)?,
            revalidate_on_update: flag_var("LEAVE_REVALIDATE_ON_UPDATE", false)?,
        };

        let ttl_hours: i64 = number_var("INVITATION_TTL_HOURS", DEFAULT_INVITATION_TTL_HOURS)?;
        let ttl = Some(ttl_hours)
            .filter(|hours| (1..=MAX_INVITATION_TTL_HOURS).contains(hours))
            .and_then(Duration::try_hours)
            .ok_or(ConfigError::InvalidTtl(ttl_hours))?;
        let frontend_url =
            env::var("APP_FRONTEND_URL").unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string());
        if !(frontend_url.starts_with("http://") || frontend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidFrontendUrl(frontend_url));
        }
        let invitations = InvitationSettings {
            ttl,
            frontend_url,
            min_password_length: number_var(
                "INVITATION_MIN_PASSWORD_LENGTH",
                DEFAULT_MIN_PASSWORD_LENGTH,
            )?,
            ..InvitationSettings::default()
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level, format },
            leave,
            invitations,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

fn number_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}

fn flag_var(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { var, value }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    InvalidFlag { var: &'static str, value: String },
    InvalidLogFormat(String),
    InvalidFrontendUrl(String),
    InvalidTtl(i64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive number (got '{value}')")
            }
            ConfigError::InvalidFlag { var, value } => {
                write!(f, "{var} must be true or false (got '{value}')")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be compact or pretty (got '{value}')")
            }
            ConfigError::InvalidFrontendUrl(value) => {
                write!(f, "APP_FRONTEND_URL must be an http(s) URL (got '{value}')")
            }
            ConfigError::InvalidTtl(hours) => write!(
                f,
                "INVITATION_TTL_HOURS must be between 1 and {} (got {hours})",
                MAX_INVITATION_TTL_HOURS
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
