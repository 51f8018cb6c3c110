use super::common::*;
use crate::error::ErrorKind;
use crate::workflows::leave::{
    LeaveChanges, LeaveDraft, LeaveId, LeavePolicy, LeaveQuery, LeaveRepository,
    LeaveRuleViolation, LeaveServiceError, LeaveStatus, LeaveType,
};
use crate::workflows::notifications::{Audience, NotificationEvent, Outbox};
use crate::workflows::people::{Actor, DepartmentId, UserId};
use crate::workflows::store::RepositoryError;

#[test]
fn staff_requests_wait_for_approval_and_notify_approvers() {
    let h = harness();

    let record = h
        .manager
        .create(pto(date(2025, 1, 1), date(2025, 1, 5)), &Actor::of(&h.staff))
        .expect("request created");

    assert_eq!(record.status(), LeaveStatus::Pending);
    assert_eq!(record.duration(), 5);
    assert_eq!(record.requester(), h.staff.id);
    assert!(record.response().is_none());

    let sent = h.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotificationEvent::RequestSubmitted);
    let approvers: Vec<_> = sent[0]
        .recipients_for(Audience::Approver)
        .map(|recipient| recipient.email.as_str())
        .collect();
    assert_eq!(approvers, vec!["ada@example.com", "lee@example.com"]);
    assert_eq!(sent[0].recipients_for(Audience::Requester).count(), 1);
}

#[test]
fn manager_requests_are_approved_immediately() {
    let h = harness();

    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 10)), &Actor::of(&h.lead))
        .expect("request created");

    assert_eq!(record.status(), LeaveStatus::Approved);
    let sent = h.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotificationEvent::RequestAutoApproved);
    assert_eq!(sent[0].recipients.len(), 1);
    assert_eq!(sent[0].recipients[0].user_id, Some(h.lead.id));
}

#[test]
fn recording_on_behalf_requires_an_approver_and_existing_target() {
    let h = harness();
    let draft = pto(date(2025, 2, 3), date(2025, 2, 4));

    match h
        .manager
        .create_on_behalf(draft.clone(), &h.colleague.id, &Actor::of(&h.staff))
    {
        Err(err @ LeaveServiceError::Rule(LeaveRuleViolation::NotApprover { .. })) => {
            assert_eq!(err.kind(), ErrorKind::Forbidden)
        }
        other => panic!("expected forbidden, got {other:?}"),
    }

    match h
        .manager
        .create_on_behalf(draft.clone(), &UserId::new(), &Actor::of(&h.lead))
    {
        Err(err @ LeaveServiceError::UserNotFound(_)) => {
            assert_eq!(err.kind(), ErrorKind::NotFound)
        }
        other => panic!("expected not found, got {other:?}"),
    }

    let record = h
        .manager
        .create_on_behalf(draft, &h.staff.id, &Actor::of(&h.lead))
        .expect("recorded on behalf");
    assert_eq!(record.requester(), h.staff.id);
    assert_eq!(record.status(), LeaveStatus::Approved);
    assert_eq!(record.responded_by(), Some(h.lead.id));
    assert_eq!(record.response_date(), Some(h.clock_now()));
    assert_eq!(
        h.dispatcher.events(),
        vec![NotificationEvent::RequestAutoApproved]
    );
}

#[test]
fn on_behalf_quota_is_computed_for_the_target() {
    let h = harness();
    h.seed_approved(&h.staff, pto(date(2025, 1, 6), date(2025, 1, 24)));

    let err = h
        .manager
        .create_on_behalf(
            pto(date(2025, 3, 3), date(2025, 3, 4)),
            &h.staff.id,
            &Actor::of(&h.admin),
        )
        .expect_err("staff has one day left");
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);

    h.manager
        .create_on_behalf(
            pto(date(2025, 3, 3), date(2025, 3, 4)),
            &h.colleague.id,
            &Actor::of(&h.admin),
        )
        .expect("colleague has full balance");
}

#[test]
fn owner_guarded_operations() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let stranger = Actor::of(&h.lead);
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");

    let err = h
        .manager
        .cancel(&record.id(), &stranger)
        .expect_err("managers cannot cancel for the owner");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let cancelled = h
        .manager
        .cancel(&record.id(), &owner)
        .expect("owner cancels");
    assert_eq!(cancelled.status(), LeaveStatus::Cancelled);
    assert_eq!(h.dispatcher.events().len(), 1, "cancel sends nothing");

    for err in [
        h.manager.cancel(&record.id(), &owner).expect_err("already cancelled"),
        h.manager.delete(&record.id(), &owner).expect_err("already cancelled"),
    ] {
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}

#[test]
fn owner_can_delete_pending_requests() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");

    h.manager.delete(&record.id(), &owner).expect("deleted");

    match h.manager.get(&record.id()) {
        Err(LeaveServiceError::LeaveNotFound(id)) => assert_eq!(id, record.id()),
        other => panic!("expected not found, got {other:?}"),
    }
    match h.manager.delete(&LeaveId::new(), &owner) {
        Err(err) => assert_eq!(err.kind(), ErrorKind::NotFound),
        Ok(()) => panic!("missing record cannot be deleted"),
    }
}

fn shifted() -> LeaveChanges {
    LeaveChanges {
        start_date: date(2025, 2, 10),
        end_date: date(2025, 2, 11),
        reason: None,
    }
}

#[test]
fn only_the_owner_may_update_or_delete() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");

    for stranger in [Actor::of(&h.colleague), Actor::of(&h.lead), Actor::of(&h.admin)] {
        match h.manager.update(&record.id(), &stranger, shifted()) {
            Err(err @ LeaveServiceError::Rule(LeaveRuleViolation::NotOwner { .. })) => {
                assert_eq!(err.kind(), ErrorKind::Forbidden)
            }
            other => panic!("expected forbidden update, got {other:?}"),
        }
        match h.manager.delete(&record.id(), &stranger) {
            Err(err @ LeaveServiceError::Rule(LeaveRuleViolation::NotOwner { .. })) => {
                assert_eq!(err.kind(), ErrorKind::Forbidden)
            }
            other => panic!("expected forbidden delete, got {other:?}"),
        }
    }

    let untouched = h.manager.get(&record.id()).expect("still stored");
    assert_eq!(untouched, record);
}

#[test]
fn update_and_delete_require_a_pending_request() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let approved = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");
    h.manager
        .respond(&approved.id(), &Actor::of(&h.lead), LeaveStatus::Approved, None)
        .expect("approved");
    let cancelled = h
        .manager
        .create(pto(date(2025, 1, 13), date(2025, 1, 14)), &owner)
        .expect("request created");
    h.manager
        .cancel(&cancelled.id(), &owner)
        .expect("owner cancels");

    for id in [approved.id(), cancelled.id()] {
        match h.manager.update(&id, &owner, shifted()) {
            Err(err @ LeaveServiceError::Rule(LeaveRuleViolation::NotPending { .. })) => {
                assert_eq!(err.kind(), ErrorKind::InvalidState)
            }
            other => panic!("expected invalid state on update, got {other:?}"),
        }
        match h.manager.delete(&id, &owner) {
            Err(err @ LeaveServiceError::Rule(LeaveRuleViolation::NotPending { .. })) => {
                assert_eq!(err.kind(), ErrorKind::InvalidState)
            }
            other => panic!("expected invalid state on delete, got {other:?}"),
        }
    }

    let kept = h.manager.get(&approved.id()).expect("approved record kept");
    assert_eq!(kept.start_date(), date(2025, 1, 6));
    assert_eq!(kept.status(), LeaveStatus::Approved);
}

#[test]
fn update_recomputes_duration_and_keeps_dates_ordered() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");

    let updated = h
        .manager
        .update(
            &record.id(),
            &owner,
            LeaveChanges {
                start_date: date(2025, 2, 10),
                end_date: date(2025, 2, 14),
                reason: Some("  family trip ".to_string()),
            },
        )
        .expect("owner updates pending request");
    assert_eq!(updated.duration(), 5);
    assert_eq!(updated.reason(), Some("family trip"));
    assert_eq!(updated.leave_type(), LeaveType::Pto);
    assert_eq!(updated.version(), record.version() + 1);

    let err = h
        .manager
        .update(
            &record.id(),
            &owner,
            LeaveChanges {
                start_date: date(2025, 2, 14),
                end_date: date(2025, 2, 10),
                reason: None,
            },
        )
        .expect_err("inverted dates");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn update_skips_quota_unless_revalidation_is_enabled() {
    let wide = LeaveChanges {
        start_date: date(2025, 3, 3),
        end_date: date(2025, 3, 31),
        reason: None,
    };

    let lenient = harness();
    let owner = Actor::of(&lenient.staff);
    let record = lenient
        .manager
        .create(pto(date(2025, 3, 3), date(2025, 3, 4)), &owner)
        .expect("request created");
    let updated = lenient
        .manager
        .update(&record.id(), &owner, wide.clone())
        .expect("edits are not re-checked by default");
    assert_eq!(updated.duration(), 29);

    let strict = harness_with(
        LeavePolicy {
            revalidate_on_update: true,
            ..LeavePolicy::default()
        },
        Outbox::default(),
    );
    let owner = Actor::of(&strict.staff);
    let record = strict
        .manager
        .create(pto(date(2025, 3, 3), date(2025, 3, 4)), &owner)
        .expect("request created");
    let err = strict
        .manager
        .update(&record.id(), &owner, wide)
        .expect_err("29 days exceeds the quota");
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
}

#[test]
fn respond_records_the_decision_and_notifies_the_requester() {
    let h = harness();
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &Actor::of(&h.staff))
        .expect("request created");
    h.dispatcher.drain();

    let err = h
        .manager
        .respond(
            &record.id(),
            &Actor::of(&h.colleague),
            LeaveStatus::Approved,
            None,
        )
        .expect_err("staff cannot respond");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = h
        .manager
        .respond(&record.id(), &Actor::of(&h.lead), LeaveStatus::Rejected, None)
        .expect_err("rejection needs a comment");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let rejected = h
        .manager
        .respond(
            &record.id(),
            &Actor::of(&h.lead),
            LeaveStatus::Rejected,
            Some("release week".to_string()),
        )
        .expect("rejected");
    assert_eq!(rejected.status(), LeaveStatus::Rejected);
    assert_eq!(rejected.comment(), Some("release week"));
    assert_eq!(rejected.responded_by(), Some(h.lead.id));
    assert_eq!(rejected.response_date(), Some(h.clock_now()));

    let sent = h.dispatcher.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotificationEvent::RequestRejected);
    assert_eq!(sent[0].recipients[0].user_id, Some(h.staff.id));
    assert_eq!(
        sent[0].details().get("comment").map(String::as_str),
        Some("release week")
    );

    let overridden = h
        .manager
        .respond(&record.id(), &Actor::of(&h.admin), LeaveStatus::Approved, None)
        .expect("approvers may override an earlier decision");
    assert_eq!(overridden.status(), LeaveStatus::Approved);
    assert_eq!(overridden.responded_by(), Some(h.admin.id));
    assert_eq!(overridden.comment(), None);
    assert_eq!(h.dispatcher.events(), vec![NotificationEvent::RequestApproved]);
}

#[test]
fn dispatcher_failures_do_not_fail_transitions() {
    let h = harness_with(LeavePolicy::default(), BrokenDispatcher);

    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &Actor::of(&h.staff))
        .expect("created despite notification failure");
    let approved = h
        .manager
        .respond(&record.id(), &Actor::of(&h.lead), LeaveStatus::Approved, None)
        .expect("responded despite notification failure");

    let stored = h
        .store
        .fetch_leave(&record.id())
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored, approved);
}

#[test]
fn concurrent_writers_lose_on_stale_versions() {
    let h = harness();
    let owner = Actor::of(&h.staff);
    let record = h
        .manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &owner)
        .expect("request created");
    let snapshot = h.manager.get(&record.id()).expect("loaded");

    h.manager
        .respond(&record.id(), &Actor::of(&h.lead), LeaveStatus::Approved, None)
        .expect("first writer wins");

    match h.store.update_leave(snapshot) {
        Err(err @ RepositoryError::StaleVersion { .. }) => {
            assert_eq!(LeaveServiceError::from(err).kind(), ErrorKind::Conflict)
        }
        other => panic!("expected stale version, got {other:?}"),
    }
}

#[test]
fn search_is_reserved_to_approvers_and_filters_conjunctively() {
    let h = harness();
    let staff = Actor::of(&h.staff);
    h.manager
        .create(pto(date(2025, 1, 6), date(2025, 1, 7)), &staff)
        .expect("pending pto");
    h.manager
        .create(
            LeaveDraft::new(date(2025, 1, 8), date(2025, 1, 8), LeaveType::SickLeave, None),
            &staff,
        )
        .expect("pending sick leave");
    h.manager
        .create(pto(date(2025, 1, 9), date(2025, 1, 9)), &Actor::of(&h.admin))
        .expect("admin pto");

    let err = h
        .manager
        .all(&staff)
        .expect_err("staff cannot list everything");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let everything = h.manager.all(&Actor::of(&h.lead)).expect("listing");
    assert_eq!(everything.len(), 3);

    let department_pending = h
        .manager
        .search(
            &Actor::of(&h.lead),
            &LeaveQuery::for_department(DepartmentId(1)).with_status(LeaveStatus::Pending),
        )
        .expect("search");
    assert_eq!(department_pending.len(), 2);

    let user_pto = h
        .manager
        .search(
            &Actor::of(&h.admin),
            &LeaveQuery::for_user(h.staff.id)
                .with_type(LeaveType::Pto)
                .with_status(LeaveStatus::Pending)
                .starting_in(2025),
        )
        .expect("search");
    assert_eq!(user_pto.len(), 1);

    let mine = h.manager.leaves_for_user(&h.staff.id).expect("own list");
    assert_eq!(mine.len(), 2);
}

#[test]
fn summary_reports_balance_and_colleagues_away_today() {
    let h = harness();
    h.seed_approved(&h.staff, pto(date(2025, 1, 20), date(2025, 1, 23)));
    h.seed_approved(&h.colleague, pto(date(2024, 12, 30), date(2025, 1, 3)));
    h.manager
        .create(pto(date(2025, 2, 3), date(2025, 2, 4)), &Actor::of(&h.staff))
        .expect("pending request");

    let summary = h.manager.summary(&h.staff.id).expect("summary");
    assert_eq!(summary.year, 2025);
    assert_eq!(summary.total_leave_requests, 2);
    assert_eq!(summary.pto_days_used, 4);
    assert_eq!(summary.pto_days_remaining, 16);
    assert_eq!(summary.team_on_leave.len(), 1);
    assert_eq!(summary.team_on_leave[0].requester(), h.colleague.id);

    let admin = h.manager.summary(&h.admin.id).expect("summary");
    assert!(admin.team_on_leave.is_empty(), "admin has no department");
}
