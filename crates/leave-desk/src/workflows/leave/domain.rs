use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::people::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaveId(pub Uuid);

impl LeaveId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeaveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    #[serde(rename = "PTO")]
    Pto,
    SickLeave,
    CompassionateLeave,
    MaternityLeave,
    Other,
}

impl LeaveType {
    pub const ALL: [LeaveType; 5] = [
        LeaveType::Pto,
        LeaveType::SickLeave,
        LeaveType::CompassionateLeave,
        LeaveType::MaternityLeave,
        LeaveType::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            LeaveType::Pto => "PTO",
            LeaveType::SickLeave => "SICK_LEAVE",
            LeaveType::CompassionateLeave => "COMPASSIONATE_LEAVE",
            LeaveType::MaternityLeave => "MATERNITY_LEAVE",
            LeaveType::Other => "OTHER",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            LeaveType::Pto => "Personal Time Off",
            LeaveType::SickLeave => "Sick Leave",
            LeaveType::CompassionateLeave => "Compassionate Leave",
            LeaveType::MaternityLeave => "Maternity Leave",
            LeaveType::Other => "Other",
        }
    }

    pub const fn requires_reason(self) -> bool {
        matches!(self, LeaveType::Other)
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeaveType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        LeaveType::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
            .ok_or_else(|| format!("unknown leave type '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeaveStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(LeaveStatus::Pending),
            "APPROVED" => Ok(LeaveStatus::Approved),
            "REJECTED" => Ok(LeaveStatus::Rejected),
            "CANCELLED" | "CANCELED" => Ok(LeaveStatus::Cancelled),
            _ => Err(format!("unknown leave status '{value}'")),
        }
    }
}

/// Inclusive day count between two dates; zero or negative when the range is inverted.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Candidate leave submitted by a requester or recorded by a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDraft {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LeaveDraft {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        reason: Option<&str>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            leave_type,
            reason: reason.map(str::to_string),
        }
    }

    pub fn duration(&self) -> i64 {
        inclusive_days(self.start_date, self.end_date)
    }
}

/// Owner edits applied to a pending request. The leave type is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveChanges {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Who decided on a request and when. Both halves are always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub responder: UserId,
    pub responded_at: DateTime<Utc>,
}

/// Stored leave record.
///
/// Dates, duration, requester, and the response pair are private so that duration is always
/// derived from the dates and ownership cannot be reassigned after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveRequest {
    id: LeaveId,
    requester: UserId,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration: u32,
    leave_type: LeaveType,
    reason: Option<String>,
    status: LeaveStatus,
    response: Option<LeaveResponse>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl LeaveRequest {
    /// Fresh record for a validated draft. Callers must have checked `start <= end`.
    pub(crate) fn open(
        requester: UserId,
        draft: LeaveDraft,
        status: LeaveStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: LeaveId::new(),
            requester,
            start_date: draft.start_date,
            end_date: draft.end_date,
            duration: 0,
            leave_type: draft.leave_type,
            reason: clean_text(draft.reason),
            status,
            response: None,
            comment: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        record.recompute_duration();
        record
    }

    pub fn id(&self) -> LeaveId {
        self.id
    }

    pub fn requester(&self) -> UserId {
        self.requester
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn leave_type(&self) -> LeaveType {
        self.leave_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn status(&self) -> LeaveStatus {
        self.status
    }

    pub fn response(&self) -> Option<LeaveResponse> {
        self.response
    }

    pub fn responded_by(&self) -> Option<UserId> {
        self.response.map(|response| response.responder)
    }

    pub fn response_date(&self) -> Option<DateTime<Utc>> {
        self.response.map(|response| response.responded_at)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.requester == *user
    }

    pub fn start_year(&self) -> i32 {
        self.start_date.year()
    }

    /// True when `date` falls within the leave, endpoints included.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Copy carrying the next revision number; repositories call this on a successful write.
    pub fn revised(mut self) -> Self {
        self.version += 1;
        self
    }

    pub(crate) fn reschedule(
        &mut self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.start_date = start_date;
        self.end_date = end_date;
        self.reason = clean_text(reason);
        self.recompute_duration();
        self.updated_at = now;
    }

    pub(crate) fn set_status(&mut self, status: LeaveStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub(crate) fn record_response(
        &mut self,
        status: LeaveStatus,
        response: LeaveResponse,
        comment: Option<String>,
    ) {
        self.status = status;
        self.response = Some(response);
        self.comment = clean_text(comment);
        self.updated_at = response.responded_at;
    }

    pub(crate) fn annotate(&mut self, comment: Option<String>) {
        self.comment = clean_text(comment);
    }

    pub(crate) fn backdate(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
        self.updated_at = at;
    }

    fn recompute_duration(&mut self) {
        let days = inclusive_days(self.start_date, self.end_date).max(0);
        self.duration = u32::try_from(days).unwrap_or(u32::MAX);
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
