//! Lifecycle events handed to the notification collaborator (e-mail or otherwise).
//!
//! Delivery is best effort: a failing dispatcher is logged and never undoes the state
//! transition that produced the event.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use super::leave::LeaveRequest;
use super::onboarding::UserInvitation;
use super::people::{User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationEvent {
    RequestSubmitted,
    RequestAutoApproved,
    RequestApproved,
    RequestRejected,
    InvitationIssued,
}

impl NotificationEvent {
    /// Template key for the delivery side.
    pub const fn label(self) -> &'static str {
        match self {
            NotificationEvent::RequestSubmitted => "leave_request_submitted",
            NotificationEvent::RequestAutoApproved => "leave_request_auto_approved",
            NotificationEvent::RequestApproved => "leave_request_approved",
            NotificationEvent::RequestRejected => "leave_request_rejected",
            NotificationEvent::InvitationIssued => "invitation_issued",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Requester,
    Approver,
    Invitee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: Option<UserId>,
    pub email: String,
    pub name: String,
    pub audience: Audience,
}

impl Recipient {
    pub fn user(user: &User, audience: Audience) -> Self {
        Self {
            user_id: Some(user.id),
            email: user.email.clone(),
            name: user.full_name(),
            audience,
        }
    }

    pub fn invitee(invitation: &UserInvitation) -> Self {
        Self {
            user_id: None,
            email: invitation.email.clone(),
            name: format!("{} {}", invitation.first_name, invitation.last_name),
            audience: Audience::Invitee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    Leave {
        leave: LeaveRequest,
    },
    Invitation {
        invitation: UserInvitation,
        link: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub recipients: Vec<Recipient>,
    pub payload: NotificationPayload,
}

impl Notification {
    pub fn leave(
        event: NotificationEvent,
        leave: LeaveRequest,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            event,
            recipients,
            payload: NotificationPayload::Leave { leave },
        }
    }

    pub fn invitation_issued(invitation: UserInvitation, link: String) -> Self {
        let recipients = vec![Recipient::invitee(&invitation)];
        Self {
            event: NotificationEvent::InvitationIssued,
            recipients,
            payload: NotificationPayload::Invitation { invitation, link },
        }
    }

    pub fn recipients_for(&self, audience: Audience) -> impl Iterator<Item = &Recipient> {
        self.recipients
            .iter()
            .filter(move |recipient| recipient.audience == audience)
    }

    /// Flat template variables for mail renderers.
    pub fn details(&self) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();
        match &self.payload {
            NotificationPayload::Leave { leave } => {
                details.insert("leave_id".to_string(), leave.id().to_string());
                details.insert(
                    "leave_type".to_string(),
                    leave.leave_type().display_name().to_string(),
                );
                details.insert("start_date".to_string(), leave.start_date().to_string());
                details.insert("end_date".to_string(), leave.end_date().to_string());
                details.insert("duration".to_string(), leave.duration().to_string());
                details.insert("status".to_string(), leave.status().label().to_string());
                if let Some(comment) = leave.comment() {
                    details.insert("comment".to_string(), comment.to_string());
                }
            }
            NotificationPayload::Invitation { invitation, link } => {
                details.insert("email".to_string(), invitation.email.clone());
                details.insert("role".to_string(), invitation.role.label().to_string());
                details.insert("link".to_string(), link.clone());
                details.insert(
                    "expires_at".to_string(),
                    invitation.expiry_date.to_rfc3339(),
                );
            }
        }
        details
    }
}

/// Outbound hook for lifecycle events.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub(crate) fn dispatch_best_effort<N>(dispatcher: &N, notification: Notification)
where
    N: NotificationDispatcher + ?Sized,
{
    let event = notification.event;
    if let Err(error) = dispatcher.dispatch(notification) {
        warn!(event = event.label(), %error, "notification dispatch failed");
    }
}

/// Dispatcher that keeps every notification in memory instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .iter()
            .map(|notification| notification.event)
            .collect()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().expect("outbox mutex poisoned"))
    }
}

impl NotificationDispatcher for Outbox {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push(notification);
        Ok(())
    }
}
