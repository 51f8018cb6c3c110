use chrono::Datelike;
use serde::Serialize;

use super::domain::LeaveRequest;
use super::domain::LeaveType;
use super::repository::LeaveRepository;
use super::service::{LeaveLifecycleManager, LeaveServiceError};
use crate::workflows::notifications::NotificationDispatcher;
use crate::workflows::people::{UserDirectory, UserId};

/// Dashboard figures for a single user.
#[derive(Debug, Clone, Serialize)]
pub struct LeaveSummary {
    pub user_id: UserId,
    pub year: i32,
    pub total_leave_requests: usize,
    pub pto_days_used: u32,
    pub pto_days_remaining: u32,
    /// Approved leave of the user's department covering today. Empty without a department.
    pub team_on_leave: Vec<LeaveRequest>,
}

impl<R, U, N> LeaveLifecycleManager<R, U, N>
where
    R: LeaveRepository + 'static,
    U: UserDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn summary(&self, user: &UserId) -> Result<LeaveSummary, LeaveServiceError> {
        let user = self.load_user(user)?;
        let today = self.clock().today();
        let year = today.year();
        let limit = self.rules().policy().annual_pto_limit;

        let total_leave_requests = self.leaves_for_user(&user.id)?.len();
        let pto_days_used = self.ledger().consumed_days(&user.id, LeaveType::Pto, year)?;
        let team_on_leave = match user.department {
            Some(department) => self.team_on_leave(department, today)?,
            None => Vec::new(),
        };

        Ok(LeaveSummary {
            user_id: user.id,
            year,
            total_leave_requests,
            pto_days_used,
            pto_days_remaining: limit.saturating_sub(pto_days_used),
            team_on_leave,
        })
    }
}
