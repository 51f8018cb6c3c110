use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{LeaveChanges, LeaveDraft, LeaveId, LeaveRequest, LeaveResponse, LeaveStatus};
use super::ledger::QuotaLedger;
use super::repository::{LeaveQuery, LeaveRepository};
use super::rules::{ApproverAction, LeavePolicy, LeaveRuleEngine, LeaveRuleViolation, OwnerAction};
use crate::clock::{Clock, SystemClock};
use crate::error::ErrorKind;
use crate::workflows::notifications::{
    dispatch_best_effort, Audience, Notification, NotificationDispatcher, NotificationEvent,
    Recipient,
};
use crate::workflows::people::{Actor, DepartmentId, Role, User, UserDirectory, UserId, UserStatus};
use crate::workflows::store::RepositoryError;

/// Owns the state machine of individual leave records.
///
/// Every operation loads the current record, asks the rule engine for a verdict, commits the
/// new state through the repository, and only then hands an event to the dispatcher.
pub struct LeaveLifecycleManager<R, U, N> {
    leaves: Arc<R>,
    directory: Arc<U>,
    dispatcher: Arc<N>,
    rules: LeaveRuleEngine<R>,
    clock: Arc<dyn Clock>,
}

impl<R, U, N> LeaveLifecycleManager<R, U, N>
where
    R: LeaveRepository + 'static,
    U: UserDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(leaves: Arc<R>, directory: Arc<U>, dispatcher: Arc<N>, policy: LeavePolicy) -> Self {
        let ledger = QuotaLedger::new(Arc::clone(&leaves));
        Self {
            leaves,
            directory,
            dispatcher,
            rules: LeaveRuleEngine::new(policy, ledger),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn rules(&self) -> &LeaveRuleEngine<R> {
        &self.rules
    }

    pub fn ledger(&self) -> &QuotaLedger<R> {
        self.rules.ledger()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Submit leave for the acting user. Managers and admins are approved on the spot.
    pub fn create(
        &self,
        draft: LeaveDraft,
        actor: &Actor,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let requester = self.load_user(&actor.user_id)?;
        let today = self.clock.today();
        let verdict = self
            .rules
            .validate_creation(&draft, &requester.id, actor.role, today)?;

        let status = if verdict.auto_approve {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Pending
        };
        let record = LeaveRequest::open(requester.id, draft, status, self.clock.now());
        let stored = self.leaves.insert_leave(record)?;

        info!(
            leave_id = %stored.id(),
            requester = %requester.id,
            status = stored.status().label(),
            duration = stored.duration(),
            "leave request created"
        );

        if verdict.auto_approve {
            self.notify(
                NotificationEvent::RequestAutoApproved,
                &stored,
                vec![Recipient::user(&requester, Audience::Requester)],
            );
        } else {
            let mut recipients = vec![Recipient::user(&requester, Audience::Requester)];
            recipients.extend(
                self.approvers()
                    .iter()
                    .filter(|approver| approver.id != requester.id)
                    .map(|approver| Recipient::user(approver, Audience::Approver)),
            );
            self.notify(NotificationEvent::RequestSubmitted, &stored, recipients);
        }

        Ok(stored)
    }

    /// Record leave for another user. The record is approved immediately with the acting
    /// approver as responder.
    pub fn create_on_behalf(
        &self,
        draft: LeaveDraft,
        target: &UserId,
        actor: &Actor,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        self.rules
            .require_approver(actor, ApproverAction::RecordOnBehalf)?;
        let recorder = self.load_user(&actor.user_id)?;
        let target = self.load_user(target)?;
        self.rules
            .validate_creation(&draft, &target.id, actor.role, self.clock.today())?;

        let now = self.clock.now();
        let mut record = LeaveRequest::open(target.id, draft, LeaveStatus::Approved, now);
        record.record_response(
            LeaveStatus::Approved,
            LeaveResponse {
                responder: recorder.id,
                responded_at: now,
            },
            None,
        );
        let stored = self.leaves.insert_leave(record)?;

        info!(
            leave_id = %stored.id(),
            requester = %target.id,
            recorded_by = %recorder.id,
            duration = stored.duration(),
            "leave recorded on behalf of user"
        );

        self.notify(
            NotificationEvent::RequestAutoApproved,
            &stored,
            vec![Recipient::user(&target, Audience::Requester)],
        );

        Ok(stored)
    }

    pub fn cancel(&self, id: &LeaveId, actor: &Actor) -> Result<LeaveRequest, LeaveServiceError> {
        let mut record = self.load_leave(id)?;
        self.rules
            .validate_owner_guarded_mutation(&record, actor, OwnerAction::Cancel)?;

        record.set_status(LeaveStatus::Cancelled, self.clock.now());
        let stored = self.leaves.update_leave(record)?;

        info!(leave_id = %stored.id(), "leave request cancelled");
        Ok(stored)
    }

    pub fn delete(&self, id: &LeaveId, actor: &Actor) -> Result<(), LeaveServiceError> {
        let record = self.load_leave(id)?;
        self.rules
            .validate_owner_guarded_mutation(&record, actor, OwnerAction::Delete)?;

        self.leaves.delete_leave(id)?;

        info!(leave_id = %id, "leave request deleted");
        Ok(())
    }

    /// Owner edit of a pending request: new dates and reason, duration recomputed.
    pub fn update(
        &self,
        id: &LeaveId,
        actor: &Actor,
        changes: LeaveChanges,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let mut record = self.load_leave(id)?;
        self.rules
            .validate_owner_guarded_mutation(&record, actor, OwnerAction::Update)?;
        self.rules
            .validate_revision(&record, &changes, self.clock.today())?;

        let LeaveChanges {
            start_date,
            end_date,
            reason,
        } = changes;
        record.reschedule(start_date, end_date, reason, self.clock.now());
        let stored = self.leaves.update_leave(record)?;

        info!(
            leave_id = %stored.id(),
            duration = stored.duration(),
            "leave request updated"
        );
        Ok(stored)
    }

    /// Approve or reject a request. Approvers may override a previous decision.
    pub fn respond(
        &self,
        id: &LeaveId,
        actor: &Actor,
        decision: LeaveStatus,
        comment: Option<String>,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        self.rules.require_approver(actor, ApproverAction::Respond)?;
        let mut record = self.load_leave(id)?;
        let responder = self.load_user(&actor.user_id)?;
        self.rules
            .validate_response(&record, decision, comment.as_deref())?;

        let previous = record.status();
        record.record_response(
            decision,
            LeaveResponse {
                responder: responder.id,
                responded_at: self.clock.now(),
            },
            comment,
        );
        let stored = self.leaves.update_leave(record)?;

        info!(
            leave_id = %stored.id(),
            responder = %responder.id,
            from = previous.label(),
            to = stored.status().label(),
            "leave request answered"
        );

        let event = match decision {
            LeaveStatus::Rejected => NotificationEvent::RequestRejected,
            _ => NotificationEvent::RequestApproved,
        };
        match self.directory.fetch_user(&stored.requester()) {
            Ok(Some(requester)) => self.notify(
                event,
                &stored,
                vec![Recipient::user(&requester, Audience::Requester)],
            ),
            Ok(None) => warn!(leave_id = %stored.id(), "requester missing; response not notified"),
            Err(error) => warn!(leave_id = %stored.id(), %error, "requester lookup failed"),
        }

        Ok(stored)
    }

    pub fn get(&self, id: &LeaveId) -> Result<LeaveRequest, LeaveServiceError> {
        self.load_leave(id)
    }

    /// Every request of a user, newest first.
    pub fn leaves_for_user(&self, user: &UserId) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        let user = self.load_user(user)?;
        Ok(self.leaves.query_leaves(&LeaveQuery::for_user(user.id))?)
    }

    /// Organisation-wide search by status, type, department, or any combination.
    pub fn search(
        &self,
        actor: &Actor,
        query: &LeaveQuery,
    ) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        self.rules.require_approver(actor, ApproverAction::Search)?;
        Ok(self.leaves.query_leaves(query)?)
    }

    pub fn all(&self, actor: &Actor) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        self.search(actor, &LeaveQuery::all())
    }

    /// Approved leave of a department that covers `date`.
    pub fn team_on_leave(
        &self,
        department: DepartmentId,
        date: chrono::NaiveDate,
    ) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        let query = LeaveQuery::for_department(department)
            .with_status(LeaveStatus::Approved)
            .covering(date);
        Ok(self.leaves.query_leaves(&query)?)
    }

    pub(crate) fn load_user(&self, id: &UserId) -> Result<User, LeaveServiceError> {
        self.directory
            .fetch_user(id)?
            .ok_or(LeaveServiceError::UserNotFound(*id))
    }

    fn load_leave(&self, id: &LeaveId) -> Result<LeaveRequest, LeaveServiceError> {
        self.leaves
            .fetch_leave(id)?
            .ok_or(LeaveServiceError::LeaveNotFound(*id))
    }

    fn approvers(&self) -> Vec<User> {
        match self.directory.users_with_roles(&[Role::Manager, Role::Admin]) {
            Ok(users) => users
                .into_iter()
                .filter(|user| user.status == UserStatus::Approved)
                .collect(),
            Err(error) => {
                warn!(%error, "could not resolve approvers for notification");
                Vec::new()
            }
        }
    }

    fn notify(&self, event: NotificationEvent, record: &LeaveRequest, recipients: Vec<Recipient>) {
        let notification = Notification::leave(event, record.clone(), recipients);
        dispatch_best_effort(self.dispatcher.as_ref(), notification);
    }
}

/// Error raised by the leave lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum LeaveServiceError {
    #[error(transparent)]
    Rule(#[from] LeaveRuleViolation),
    #[error("leave request {0} not found")]
    LeaveNotFound(LeaveId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LeaveServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaveServiceError::Rule(violation) => violation.kind(),
            LeaveServiceError::LeaveNotFound(_) | LeaveServiceError::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            LeaveServiceError::Repository(error) => error.kind(),
        }
    }
}
