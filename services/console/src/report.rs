use crate::infra::{load_roster, storage_error};
use chrono::{Datelike, Utc};
use clap::Args;
use leave_desk::config::AppConfig;
use leave_desk::error::AppError;
use leave_desk::memory::InMemoryStore;
use leave_desk::workflows::leave::{LeaveHistoryImporter, LeaveType, QuotaLedger};
use leave_desk::workflows::people::{normalize_email, User};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct QuotaArgs {
    /// User roster CSV (email, first_name, last_name, role, department)
    #[arg(long)]
    pub(crate) users: PathBuf,
    /// Leave history CSV (email, leave_type, start_date, end_date, status, reason, responded_by)
    #[arg(long)]
    pub(crate) history: PathBuf,
    /// Calendar year to report (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Restrict the report to a single user
    #[arg(long)]
    pub(crate) email: Option<String>,
}

/// One line of the quota report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuotaLine {
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) used: u32,
    pub(crate) remaining: u32,
}

pub(crate) fn run_quota_report(args: QuotaArgs, config: &AppConfig) -> Result<(), AppError> {
    let QuotaArgs {
        users,
        history,
        year,
        email,
    } = args;
    let year = year.unwrap_or_else(|| Utc::now().year());
    let limit = config.leave.annual_pto_limit;

    let store = Arc::new(InMemoryStore::new());
    let roster = load_roster(&users, store.as_ref(), Utc::now())?;
    let imported = LeaveHistoryImporter::from_path(&history, store.as_ref(), store.as_ref())?;
    info!(
        users = roster.len(),
        rows = imported.imported,
        approved_days = imported.approved_days,
        "leave history loaded"
    );

    let selected = select_users(roster, email.as_deref());
    if selected.is_empty() {
        println!("No matching users in {}", users.display());
        return Ok(());
    }

    let ledger = QuotaLedger::new(Arc::clone(&store));
    let lines = quota_lines(&ledger, &selected, year, limit)?;

    println!("PTO usage for {year} (annual limit {limit} days)");
    for line in &lines {
        let flag = if line.used > limit { "  OVER LIMIT" } else { "" };
        println!(
            "- {} <{}>: {} used, {} remaining{}",
            line.name, line.email, line.used, line.remaining, flag
        );
    }
    Ok(())
}

fn select_users(mut roster: Vec<User>, email: Option<&str>) -> Vec<User> {
    if let Some(email) = email {
        let wanted = normalize_email(email);
        roster.retain(|user| normalize_email(&user.email) == wanted);
    }
    roster.sort_by(|a, b| a.email.cmp(&b.email));
    roster
}

pub(crate) fn quota_lines(
    ledger: &QuotaLedger<InMemoryStore>,
    users: &[User],
    year: i32,
    limit: u32,
) -> Result<Vec<QuotaLine>, AppError> {
    users
        .iter()
        .map(|user| {
            let used = ledger
                .consumed_days(&user.id, LeaveType::Pto, year)
                .map_err(storage_error)?;
            Ok(QuotaLine {
                email: user.email.clone(),
                name: user.full_name(),
                used,
                remaining: limit.saturating_sub(used),
            })
        })
        .collect()
}
