use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher as _, SaltString};
use argon2::Argon2;
use chrono::{DateTime, NaiveDate, Utc};
use leave_desk::error::AppError;
use leave_desk::workflows::leave::LeaveImportError;
use leave_desk::workflows::onboarding::{HashError, PasswordHasher};
use leave_desk::workflows::people::{
    DepartmentId, Role, User, UserDirectory, UserId, UserStatus,
};
use leave_desk::workflows::store::RepositoryError;
use serde::Deserialize;
use std::path::Path;

/// Argon2id with a fresh random salt per password, PHC string output.
#[derive(Default)]
pub(crate) struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash_password(&self, raw: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashError::Backend(err.to_string()))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn storage_error(err: RepositoryError) -> AppError {
    AppError::Import(LeaveImportError::Repository(err))
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    email: String,
    first_name: String,
    last_name: String,
    role: Role,
    #[serde(default, deserialize_with = "deserialize_optional_department")]
    department: Option<DepartmentId>,
}

/// Load `email,first_name,last_name,role,department` rows as approved accounts.
pub(crate) fn load_roster<P, U>(
    path: P,
    directory: &U,
    now: DateTime<Utc>,
) -> Result<Vec<User>, AppError>
where
    P: AsRef<Path>,
    U: UserDirectory + ?Sized,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(std::io::Error::from)?;

    let mut users = Vec::new();
    for row in reader.deserialize::<RosterRow>() {
        let row = row.map_err(std::io::Error::from)?;
        let user = User {
            id: UserId::new(),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: String::new(),
            role: row.role,
            department: row.department,
            status: UserStatus::Approved,
            created_at: now,
            updated_at: now,
        };
        users.push(directory.insert_user(user).map_err(storage_error)?);
    }
    Ok(users)
}

fn deserialize_optional_department<'de, D>(
    deserializer: D,
) -> Result<Option<DepartmentId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(DepartmentId)
                .map_err(serde::de::Error::custom)
        })
        .transpose()
}
