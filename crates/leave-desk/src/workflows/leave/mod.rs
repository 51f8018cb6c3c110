mod analytics;
mod domain;
mod import;
mod ledger;
mod repository;
mod rules;
mod service;

#[cfg(test)]
mod tests;

pub use analytics::LeaveSummary;
pub use domain::{
    inclusive_days, LeaveChanges, LeaveDraft, LeaveId, LeaveRequest, LeaveResponse, LeaveStatus,
    LeaveType,
};
pub use import::{ImportReport, LeaveHistoryImporter, LeaveImportError};
pub use ledger::{QuotaLedger, DEFAULT_ANNUAL_PTO_LIMIT};
pub use repository::{LeaveQuery, LeaveRepository};
pub use rules::{
    ApproverAction, CreationVerdict, LeavePolicy, LeaveRuleEngine, LeaveRuleViolation,
    OwnerAction,
};
pub use service::{LeaveLifecycleManager, LeaveServiceError};
