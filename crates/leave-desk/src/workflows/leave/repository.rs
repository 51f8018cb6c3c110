use chrono::NaiveDate;

use super::domain::{LeaveId, LeaveRequest, LeaveStatus, LeaveType};
use crate::workflows::people::{DepartmentId, UserId};
use crate::workflows::store::RepositoryError;

/// Storage abstraction so the lifecycle manager can be exercised in isolation.
///
/// `update_leave` is a compare-and-swap: it must fail with
/// [`RepositoryError::StaleVersion`] when the stored version differs from the version of the
/// record passed in, and return the record with its version bumped on success.
pub trait LeaveRepository: Send + Sync {
    fn insert_leave(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError>;
    fn update_leave(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError>;
    fn fetch_leave(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError>;
    fn delete_leave(&self, id: &LeaveId) -> Result<(), RepositoryError>;
    /// Records matching every populated filter, newest first.
    fn query_leaves(&self, query: &LeaveQuery) -> Result<Vec<LeaveRequest>, RepositoryError>;
}

/// Conjunctive filter over leave records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveQuery {
    pub requester: Option<UserId>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub department: Option<DepartmentId>,
    pub start_year: Option<i32>,
    pub covering: Option<NaiveDate>,
}

impl LeaveQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            requester: Some(user),
            ..Self::default()
        }
    }

    pub fn for_department(department: DepartmentId) -> Self {
        Self {
            department: Some(department),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: LeaveStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, leave_type: LeaveType) -> Self {
        self.leave_type = Some(leave_type);
        self
    }

    pub fn starting_in(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn covering(mut self, date: NaiveDate) -> Self {
        self.covering = Some(date);
        self
    }

    /// Evaluate the filter; `requester_department` is the department of the record's owner,
    /// which storage backends resolve through their user table.
    pub fn matches(
        &self,
        record: &LeaveRequest,
        requester_department: Option<DepartmentId>,
    ) -> bool {
        self.requester
            .map_or(true, |user| record.requester() == user)
            && self.status.map_or(true, |status| record.status() == status)
            && self
                .leave_type
                .map_or(true, |leave_type| record.leave_type() == leave_type)
            && self
                .department
                .map_or(true, |department| requester_department == Some(department))
            && self
                .start_year
                .map_or(true, |year| record.start_year() == year)
            && self.covering.map_or(true, |date| record.covers(date))
    }
}
