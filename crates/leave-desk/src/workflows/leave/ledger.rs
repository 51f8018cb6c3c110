use std::sync::Arc;

use super::domain::{LeaveStatus, LeaveType};
use super::repository::{LeaveQuery, LeaveRepository};
use crate::workflows::people::UserId;
use crate::workflows::store::RepositoryError;

/// Annual allowance of approved PTO days per user.
pub const DEFAULT_ANNUAL_PTO_LIMIT: u32 = 20;

/// Read-only view over approved leave used for quota checks and balances.
///
/// A leave is attributed to the calendar year of its start date, even when it runs into the
/// following year.
pub struct QuotaLedger<R> {
    repository: Arc<R>,
}

impl<R> Clone for QuotaLedger<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> QuotaLedger<R>
where
    R: LeaveRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Sum of durations of the user's approved leave of `leave_type` starting in `year`.
    pub fn consumed_days(
        &self,
        user: &UserId,
        leave_type: LeaveType,
        year: i32,
    ) -> Result<u32, RepositoryError> {
        let query = LeaveQuery::for_user(*user)
            .with_type(leave_type)
            .with_status(LeaveStatus::Approved)
            .starting_in(year);

        let consumed = self
            .repository
            .query_leaves(&query)?
            .iter()
            .map(|record| record.duration())
            .fold(0u32, u32::saturating_add);
        Ok(consumed)
    }

    pub fn remaining_pto(
        &self,
        user: &UserId,
        year: i32,
        limit: u32,
    ) -> Result<u32, RepositoryError> {
        let consumed = self.consumed_days(user, LeaveType::Pto, year)?;
        Ok(limit.saturating_sub(consumed))
    }
}
