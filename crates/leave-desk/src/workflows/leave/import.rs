//! CSV import of leave taken before the system went live, so quota checks see past usage.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{LeaveDraft, LeaveRequest, LeaveResponse, LeaveStatus, LeaveType};
use super::repository::LeaveRepository;
use super::rules::{check_decision, check_reason};
use crate::workflows::people::{normalize_email, UserDirectory, UserId};
use crate::workflows::store::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum LeaveImportError {
    #[error("failed to read leave history: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid leave history CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    InvalidRow { line: u64, message: String },
    #[error("line {line}: no user with e-mail {email}")]
    UnknownUser { line: u64, email: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Totals reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub approved_days: u32,
}

/// Loads `email,leave_type,start_date,end_date,status[,reason][,responded_by][,comment]` rows.
///
/// Every row is parsed and resolved before the first insert, so a bad row leaves the
/// repository untouched.
pub struct LeaveHistoryImporter;

impl LeaveHistoryImporter {
    pub fn from_path<P, R, U>(
        path: P,
        leaves: &R,
        directory: &U,
    ) -> Result<ImportReport, LeaveImportError>
    where
        P: AsRef<Path>,
        R: LeaveRepository + ?Sized,
        U: UserDirectory + ?Sized,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, leaves, directory)
    }

    pub fn from_reader<Rd, R, U>(
        reader: Rd,
        leaves: &R,
        directory: &U,
    ) -> Result<ImportReport, LeaveImportError>
    where
        Rd: Read,
        R: LeaveRepository + ?Sized,
        U: UserDirectory + ?Sized,
    {
        let records = Self::parse(reader, directory)?;

        let mut report = ImportReport::default();
        for record in records {
            if record.status() == LeaveStatus::Approved {
                report.approved_days = report.approved_days.saturating_add(record.duration());
            }
            leaves.insert_leave(record)?;
            report.imported += 1;
        }

        Ok(report)
    }

    fn parse<Rd, U>(reader: Rd, directory: &U) -> Result<Vec<LeaveRequest>, LeaveImportError>
    where
        Rd: Read,
        U: UserDirectory + ?Sized,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let mut records = Vec::new();
        for result in csv_reader.records() {
            let raw = result?;
            let line = raw
                .position()
                .map(|position| position.line())
                .unwrap_or_default();
            let row: HistoryRow = raw.deserialize(Some(&headers))?;
            records.push(row.into_record(line, directory)?);
        }
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    email: String,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reason: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    responded_by: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    comment: Option<String>,
}

impl HistoryRow {
    fn into_record<U>(self, line: u64, directory: &U) -> Result<LeaveRequest, LeaveImportError>
    where
        U: UserDirectory + ?Sized,
    {
        let invalid = |message: String| LeaveImportError::InvalidRow { line, message };

        let leave_type: LeaveType = self.leave_type.parse().map_err(invalid)?;
        let status: LeaveStatus = self.status.parse().map_err(invalid)?;
        if self.start_date > self.end_date {
            return Err(invalid(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        check_reason(leave_type, self.reason.as_deref())
            .map_err(|violation| invalid(violation.to_string()))?;
        if status == LeaveStatus::Rejected {
            check_decision(status, self.comment.as_deref())
                .map_err(|violation| invalid(violation.to_string()))?;
        }

        let owner = resolve_user(directory, &self.email, line)?;
        let responder = match self.responded_by.as_deref() {
            Some(email) => Some(resolve_user(directory, email, line)?),
            None => None,
        };

        let recorded_at = midnight(self.start_date);
        let draft = LeaveDraft {
            start_date: self.start_date,
            end_date: self.end_date,
            leave_type,
            reason: self.reason,
        };
        let mut record = LeaveRequest::open(owner, draft, status, recorded_at);
        match (responder, status) {
            (Some(responder), LeaveStatus::Approved | LeaveStatus::Rejected) => {
                let response = LeaveResponse {
                    responder,
                    responded_at: recorded_at,
                };
                record.record_response(status, response, self.comment);
            }
            _ => record.annotate(self.comment),
        }
        record.backdate(recorded_at);
        Ok(record)
    }
}

fn resolve_user<U>(
    directory: &U,
    email: &str,
    line: u64,
) -> Result<UserId, LeaveImportError>
where
    U: UserDirectory + ?Sized,
{
    directory
        .find_user_by_email(&normalize_email(email))?
        .map(|user| user.id)
        .ok_or_else(|| LeaveImportError::UnknownUser {
            line,
            email: email.to_string(),
        })
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
