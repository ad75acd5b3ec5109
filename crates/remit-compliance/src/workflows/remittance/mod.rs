//! Remittance compliance and escalation engine.
//!
//! A scheduled run pulls every overdue platform-fee obligation, escalates the owing lawyer's
//! status through `current < warning < overdue < suspended`, sends milestone reminders, and
//! finally recomputes outstanding fee totals for the whole directory.

pub mod aggregate;
pub mod cadence;
pub mod domain;
pub mod escalation;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use cadence::{CadenceMode, ReminderCadence, ReminderPayload, REMINDER_MILESTONES};
pub use domain::{
    LawyerComplianceRecord, LawyerContact, LawyerId, RemittanceObligation, RemittanceStatus,
    StatusEscalation, TransactionId,
};
pub use escalation::{EscalationAction, EscalationDecision, EscalationPolicy, EscalationThresholds};
pub use report::{
    AggregateRefreshSummary, ObligationOutcome, OutcomeAction, ReminderOutcome, RunReport,
};
pub use repository::{
    AggregateError, AggregateRefresher, LawyerDirectory, NotifyError, ObligationStore,
    PageRequest, ReminderLedger, ReminderNotifier, RepositoryError,
};
pub use router::compliance_router;
pub use service::{ComplianceCollaborators, ComplianceRunError, RemittanceComplianceService};
