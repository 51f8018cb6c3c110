use std::fmt;

use chrono::{Datelike, NaiveDate};

use super::domain::{LeaveChanges, LeaveDraft, LeaveRequest, LeaveStatus, LeaveType};
use super::ledger::{QuotaLedger, DEFAULT_ANNUAL_PTO_LIMIT};
use super::repository::LeaveRepository;
use super::service::LeaveServiceError;
use crate::error::ErrorKind;
use crate::workflows::people::{Actor, Role, UserId};

/// Operations reserved to the requester while the request is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Cancel,
    Delete,
    Update,
}

impl fmt::Display for OwnerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OwnerAction::Cancel => "cancel",
            OwnerAction::Delete => "delete",
            OwnerAction::Update => "update",
        })
    }
}

/// Operations reserved to managers and admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproverAction {
    RecordOnBehalf,
    Respond,
    Search,
}

impl fmt::Display for ApproverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApproverAction::RecordOnBehalf => "record leave on behalf of another user",
            ApproverAction::Respond => "respond to leave requests",
            ApproverAction::Search => "search leave requests across the organisation",
        })
    }
}

/// Business rule failures raised by [`LeaveRuleEngine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaveRuleViolation {
    #[error("start date {start} must not be after end date {end}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },
    #[error("start date {start} must be today or in the future (today is {today})")]
    StartInPast { start: NaiveDate, today: NaiveDate },
    #[error("reason is required for OTHER leave type")]
    MissingReason,
    #[error(
        "you have exceeded the annual limit of {limit} days for personal time off. \
         You have already used {used} days this year"
    )]
    QuotaExceeded { limit: u32, used: u32, requested: u32 },
    #[error("leave requests can only be answered with APPROVED or REJECTED, not {0}")]
    UnsupportedDecision(LeaveStatus),
    #[error("a comment is required when rejecting a leave request")]
    MissingRejectionComment,
    #[error("you can only {action} your own leave requests")]
    NotOwner { action: OwnerAction },
    #[error("you can only {action} PENDING leave requests (this one is {status})")]
    NotPending {
        action: OwnerAction,
        status: LeaveStatus,
    },
    #[error("role {role} is not allowed to {action}")]
    NotApprover { role: Role, action: ApproverAction },
}

impl LeaveRuleViolation {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaveRuleViolation::InvertedDates { .. }
            | LeaveRuleViolation::StartInPast { .. }
            | LeaveRuleViolation::MissingReason
            | LeaveRuleViolation::UnsupportedDecision(_)
            | LeaveRuleViolation::MissingRejectionComment => ErrorKind::Validation,
            LeaveRuleViolation::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            LeaveRuleViolation::NotOwner { .. } | LeaveRuleViolation::NotApprover { .. } => {
                ErrorKind::Forbidden
            }
            LeaveRuleViolation::NotPending { .. } => ErrorKind::InvalidState,
        }
    }
}

/// Policy dials for leave validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeavePolicy {
    pub annual_pto_limit: u32,
    /// Accept requests whose start date is already in the past.
    pub allow_backdated: bool,
    /// Re-run the reason and quota rules when an owner edits a pending request.
    pub revalidate_on_update: bool,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            annual_pto_limit: DEFAULT_ANNUAL_PTO_LIMIT,
            allow_backdated: false,
            revalidate_on_update: false,
        }
    }
}

/// Outcome of a successful creation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationVerdict {
    pub auto_approve: bool,
    pub duration: u32,
}

/// Validation of candidate requests and transitions. Never mutates state.
pub struct LeaveRuleEngine<R> {
    policy: LeavePolicy,
    ledger: QuotaLedger<R>,
}

impl<R> LeaveRuleEngine<R>
where
    R: LeaveRepository + 'static,
{
    pub fn new(policy: LeavePolicy, ledger: QuotaLedger<R>) -> Self {
        Self { policy, ledger }
    }

    pub fn policy(&self) -> &LeavePolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &QuotaLedger<R> {
        &self.ledger
    }

    /// Check a new request for `requester`. Auto-approval follows the acting role.
    pub fn validate_creation(
        &self,
        draft: &LeaveDraft,
        requester: &UserId,
        acting_role: Role,
        today: NaiveDate,
    ) -> Result<CreationVerdict, LeaveServiceError> {
        let duration = self.check_dates(draft.start_date, draft.end_date, today)?;
        check_reason(draft.leave_type, draft.reason.as_deref())?;

        if draft.leave_type == LeaveType::Pto {
            let used = self
                .ledger
                .consumed_days(requester, LeaveType::Pto, today.year())?;
            self.check_quota(used, duration)?;
        }

        Ok(CreationVerdict {
            auto_approve: acting_role.is_approver(),
            duration,
        })
    }

    /// Check an owner edit. Date order is always enforced; the remaining creation rules only
    /// when the policy asks for revalidation.
    pub fn validate_revision(
        &self,
        record: &LeaveRequest,
        changes: &LeaveChanges,
        today: NaiveDate,
    ) -> Result<u32, LeaveServiceError> {
        if !self.policy.revalidate_on_update {
            return Ok(ordered_duration(changes.start_date, changes.end_date)?);
        }

        let duration = self.check_dates(changes.start_date, changes.end_date, today)?;
        check_reason(record.leave_type(), changes.reason.as_deref())?;

        if record.leave_type() == LeaveType::Pto {
            // Pending records never count toward the approved total, so no exclusion is needed.
            let used = self
                .ledger
                .consumed_days(&record.requester(), LeaveType::Pto, today.year())?;
            self.check_quota(used, duration)?;
        }

        Ok(duration)
    }

    /// Only APPROVED or REJECTED may be set, and a rejection needs a comment. The current
    /// status is not checked: approvers may override an earlier decision.
    pub fn validate_response(
        &self,
        _record: &LeaveRequest,
        decision: LeaveStatus,
        comment: Option<&str>,
    ) -> Result<(), LeaveRuleViolation> {
        check_decision(decision, comment)
    }

    pub fn validate_owner_guarded_mutation(
        &self,
        record: &LeaveRequest,
        actor: &Actor,
        action: OwnerAction,
    ) -> Result<(), LeaveRuleViolation> {
        if !record.is_owned_by(&actor.user_id) {
            return Err(LeaveRuleViolation::NotOwner { action });
        }

        if record.status() != LeaveStatus::Pending {
            return Err(LeaveRuleViolation::NotPending {
                action,
                status: record.status(),
            });
        }

        Ok(())
    }

    pub fn require_approver(
        &self,
        actor: &Actor,
        action: ApproverAction,
    ) -> Result<(), LeaveRuleViolation> {
        if actor.role.is_approver() {
            Ok(())
        } else {
            Err(LeaveRuleViolation::NotApprover {
                role: actor.role,
                action,
            })
        }
    }

    /// Exactly the limit is allowed; one day over is not.
    pub fn check_quota(&self, used: u32, requested: u32) -> Result<(), LeaveRuleViolation> {
        let limit = self.policy.annual_pto_limit;
        if used.saturating_add(requested) > limit {
            return Err(LeaveRuleViolation::QuotaExceeded {
                limit,
                used,
                requested,
            });
        }
        Ok(())
    }

    fn check_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<u32, LeaveRuleViolation> {
        let duration = ordered_duration(start, end)?;
        if !self.policy.allow_backdated && start < today {
            return Err(LeaveRuleViolation::StartInPast { start, today });
        }
        Ok(duration)
    }
}

fn ordered_duration(start: NaiveDate, end: NaiveDate) -> Result<u32, LeaveRuleViolation> {
    if start > end {
        return Err(LeaveRuleViolation::InvertedDates { start, end });
    }
    let days = super::domain::inclusive_days(start, end);
    Ok(u32::try_from(days).unwrap_or(u32::MAX))
}

pub(super) fn check_decision(
    decision: LeaveStatus,
    comment: Option<&str>,
) -> Result<(), LeaveRuleViolation> {
    match decision {
        LeaveStatus::Approved => Ok(()),
        LeaveStatus::Rejected if is_blank(comment) => {
            Err(LeaveRuleViolation::MissingRejectionComment)
        }
        LeaveStatus::Rejected => Ok(()),
        other => Err(LeaveRuleViolation::UnsupportedDecision(other)),
    }
}

pub(super) fn check_reason(
    leave_type: LeaveType,
    reason: Option<&str>,
) -> Result<(), LeaveRuleViolation> {
    if leave_type.requires_reason() && is_blank(reason) {
        return Err(LeaveRuleViolation::MissingReason);
    }
    Ok(())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}
