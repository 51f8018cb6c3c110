use crate::infra::{storage_error, Argon2PasswordHasher};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use leave_desk::clock::{Clock, ManualClock};
use leave_desk::config::AppConfig;
use leave_desk::error::AppError;
use leave_desk::memory::InMemoryStore;
use leave_desk::workflows::leave::{
    LeaveDraft, LeaveLifecycleManager, LeaveRequest, LeaveStatus, LeaveType,
};
use leave_desk::workflows::notifications::Outbox;
use leave_desk::workflows::onboarding::{InvitationDraft, InvitationManager};
use leave_desk::workflows::people::{
    Actor, DepartmentId, Role, User, UserDirectory, UserId, UserStatus,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Pin the demo clock to this date (YYYY-MM-DD). Defaults to 2025-01-01.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print every dispatched notification as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

struct Cast {
    admin: User,
    lead: User,
    sofia: User,
    kwame: User,
}

pub(crate) fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let DemoArgs { today, json } = args;
    let today = today
        .or_else(|| NaiveDate::from_ymd_opt(2025, 1, 1))
        .unwrap_or_else(|| Utc::now().date_naive());

    let store = Arc::new(InMemoryStore::new());
    let outbox = Arc::new(Outbox::default());
    let clock = Arc::new(ManualClock::on(today));
    let cast = seed_cast(store.as_ref(), clock.now())?;

    let leaves = LeaveLifecycleManager::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&outbox),
        config.leave.clone(),
    )
    .with_clock(clock.clone());
    let invitations = InvitationManager::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&outbox),
        Arc::new(Argon2PasswordHasher::default()),
        config.invitations.clone(),
    )
    .with_clock(clock.clone());

    println!("Leave desk demo (clock pinned to {today})");
    let staff = Actor::of(&cast.sofia);
    let lead = Actor::of(&cast.lead);

    println!("\nLeave requests");
    let pending = leaves.create(
        LeaveDraft::new(today, today + Duration::days(4), LeaveType::Pto, None),
        &staff,
    )?;
    print_leave("Staff PTO request", &pending);

    let recorded = leaves.create_on_behalf(
        LeaveDraft::new(
            today + Duration::days(14),
            today + Duration::days(18),
            LeaveType::Pto,
            None,
        ),
        &cast.kwame.id,
        &lead,
    )?;
    print_leave("Manager records PTO for a colleague", &recorded);

    let over_limit = leaves.create(
        LeaveDraft::new(
            today + Duration::days(151),
            today + Duration::days(170),
            LeaveType::Pto,
            None,
        ),
        &Actor::of(&cast.kwame),
    );
    print_outcome("Colleague asks for 20 more PTO days", over_limit);

    let own = leaves.create(
        LeaveDraft::new(
            today + Duration::days(30),
            today + Duration::days(34),
            LeaveType::Pto,
            None,
        ),
        &lead,
    )?;
    print_leave("Manager self request", &own);

    let missing_reason = leaves.create(
        LeaveDraft::new(today, today, LeaveType::Other, Some("  ")),
        &staff,
    );
    print_outcome("OTHER leave without a reason", missing_reason);

    let rejected = leaves.respond(
        &pending.id(),
        &lead,
        LeaveStatus::Rejected,
        Some("Sprint demo that week".to_string()),
    )?;
    print_leave("Manager rejects the staff request", &rejected);

    let cancel_again = leaves.cancel(&pending.id(), &staff);
    print_outcome("Staff cancels the answered request", cancel_again);

    let summary = leaves.summary(&cast.kwame.id)?;
    println!(
        "- Dashboard for {}: {} requests, {} PTO days used, {} left, {} away today",
        cast.kwame.full_name(),
        summary.total_leave_requests,
        summary.pto_days_used,
        summary.pto_days_remaining,
        summary.team_on_leave.len()
    );

    println!("\nOnboarding");
    let admin = Actor::of(&cast.admin);
    let invite = InvitationDraft {
        email: "jonas.berg@example.com".to_string(),
        first_name: "Jonas".to_string(),
        last_name: "Berg".to_string(),
        role: Role::Staff,
        department: Some(DepartmentId(1)),
    };
    let invitation = invitations.issue(&admin, invite.clone())?;
    println!(
        "- Invitation issued to {} (expires {}) -> {}",
        invitation.email,
        invitation.expiry_date,
        invitations.settings().link_for(&invitation.token)
    );
    print_outcome(
        "Second invitation for the same address",
        invitations.issue(&admin, invite),
    );
    print_outcome(
        "Renewal while still valid",
        invitations.renew(&invitation.email),
    );

    clock.advance(invitations.settings().ttl + Duration::hours(1));
    print_outcome(
        "Completion after expiry",
        invitations.complete(&invitation.token, "s3cure-pass", "s3cure-pass"),
    );

    let renewed = invitations.renew(&invitation.email)?;
    println!("- Invitation renewed (expires {})", renewed.expiry_date);
    let user = invitations.complete(&renewed.token, "s3cure-pass", "s3cure-pass")?;
    println!(
        "- {} joined as {} ({:?})",
        user.full_name(),
        user.role,
        user.status
    );
    print_outcome(
        "Token reuse",
        invitations.complete(&renewed.token, "s3cure-pass", "s3cure-pass"),
    );

    let sent = outbox.sent();
    println!("\nNotifications ({})", sent.len());
    for notification in &sent {
        let recipients: Vec<&str> = notification
            .recipients
            .iter()
            .map(|recipient| recipient.email.as_str())
            .collect();
        println!(
            "- {} -> {}",
            notification.event.label(),
            recipients.join(", ")
        );
        if json {
            match serde_json::to_string_pretty(notification) {
                Ok(body) => println!("{body}"),
                Err(err) => println!("  payload unavailable: {err}"),
            }
        }
    }

    Ok(())
}

fn seed_cast<U>(directory: &U, now: DateTime<Utc>) -> Result<Cast, AppError>
where
    U: UserDirectory + ?Sized,
{
    let add = |email: &str, first: &str, last: &str, role: Role, department: Option<u64>| {
        directory
            .insert_user(User {
                id: UserId::new(),
                email: email.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                password_hash: String::new(),
                role,
                department: department.map(DepartmentId),
                status: UserStatus::Approved,
                created_at: now,
                updated_at: now,
            })
            .map_err(storage_error)
    };

    Ok(Cast {
        admin: add("amara.okafor@example.com", "Amara", "Okafor", Role::Admin, None)?,
        lead: add("liam.chen@example.com", "Liam", "Chen", Role::Manager, Some(1))?,
        sofia: add("sofia.rossi@example.com", "Sofia", "Rossi", Role::Staff, Some(1))?,
        kwame: add("kwame.mensah@example.com", "Kwame", "Mensah", Role::Staff, Some(1))?,
    })
}

fn print_leave(label: &str, record: &LeaveRequest) {
    println!(
        "- {label}: {} {} -> {} ({} days) status {}",
        record.leave_type().display_name(),
        record.start_date(),
        record.end_date(),
        record.duration(),
        record.status()
    );
    if let Some(comment) = record.comment() {
        println!("  Comment: {comment}");
    }
}

fn print_outcome<T, E>(label: &str, outcome: Result<T, E>)
where
    E: Into<AppError>,
{
    match outcome {
        Ok(_) => println!("- {label}: accepted"),
        Err(err) => {
            let err: AppError = err.into();
            println!("- {label}: refused ({err})");
        }
    }
}
