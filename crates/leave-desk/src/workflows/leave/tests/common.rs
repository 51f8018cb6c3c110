use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::clock::{Clock, ManualClock};
use crate::memory::InMemoryStore;
use crate::workflows::leave::{
    LeaveDraft, LeaveLifecycleManager, LeavePolicy, LeaveRepository, LeaveRequest, LeaveResponse,
    LeaveStatus, LeaveType,
};
use crate::workflows::notifications::{
    Notification, NotificationDispatcher, NotificationError, Outbox,
};
use crate::workflows::people::{DepartmentId, Role, User, UserDirectory, UserId, UserStatus};

pub(super) type Manager<N = Outbox> = LeaveLifecycleManager<InMemoryStore, InMemoryStore, N>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn user(email: &str, role: Role, department: Option<DepartmentId>) -> User {
    let now = Utc
        .with_ymd_and_hms(2024, 12, 1, 9, 0, 0)
        .single()
        .expect("valid instant");
    let (first_name, _) = email.split_once('@').unwrap_or((email, ""));
    User {
        id: UserId::new(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        password_hash: String::new(),
        role,
        department,
        status: UserStatus::Approved,
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn pto(start: NaiveDate, end: NaiveDate) -> LeaveDraft {
    LeaveDraft::new(start, end, LeaveType::Pto, None)
}

pub(super) struct Harness<N = Outbox> {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) dispatcher: Arc<N>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) manager: Manager<N>,
    pub(super) staff: User,
    pub(super) colleague: User,
    pub(super) lead: User,
    pub(super) admin: User,
}

impl<N> Harness<N>
where
    N: NotificationDispatcher + 'static,
{
    /// Approved PTO stored directly, bypassing the rule engine.
    pub(super) fn seed_approved(&self, owner: &User, draft: LeaveDraft) -> LeaveRequest {
        let now = self.clock.now();
        let mut record = LeaveRequest::open(owner.id, draft, LeaveStatus::Approved, now);
        record.record_response(
            LeaveStatus::Approved,
            LeaveResponse {
                responder: self.lead.id,
                responded_at: now,
            },
            None,
        );
        self.store.insert_leave(record).expect("seed leave stored")
    }
}

pub(super) fn harness() -> Harness {
    harness_with(LeavePolicy::default(), Outbox::default())
}

pub(super) fn harness_with<N>(policy: LeavePolicy, dispatcher: N) -> Harness<N>
where
    N: NotificationDispatcher + 'static,
{
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(dispatcher);
    let clock = Arc::new(ManualClock::on(date(2025, 1, 1)));
    let engineering = DepartmentId(1);

    let staff = store
        .insert_user(user("sam@example.com", Role::Staff, Some(engineering)))
        .expect("staff stored");
    let colleague = store
        .insert_user(user("cole@example.com", Role::Staff, Some(engineering)))
        .expect("colleague stored");
    let lead = store
        .insert_user(user("lee@example.com", Role::Manager, Some(engineering)))
        .expect("manager stored");
    let admin = store
        .insert_user(user("ada@example.com", Role::Admin, None))
        .expect("admin stored");

    let manager = LeaveLifecycleManager::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        policy,
    )
    .with_clock(clock.clone());

    Harness {
        store,
        dispatcher,
        clock,
        manager,
        staff,
        colleague,
        lead,
        admin,
    }
}

/// Dispatcher whose transport is always down.
#[derive(Default)]
pub(super) struct BrokenDispatcher;

impl NotificationDispatcher for BrokenDispatcher {
    fn dispatch(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

impl<N> Harness<N> {
    pub(super) fn clock_now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }
}
