use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{LawyerId, RemittanceStatus, TransactionId};
use super::escalation::EscalationAction;

/// Action recorded against one obligation in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    None,
    WarningStatus,
    OverdueStatus,
    Suspended,
    Error,
}

impl From<EscalationAction> for OutcomeAction {
    fn from(value: EscalationAction) -> Self {
        match value {
            EscalationAction::None => OutcomeAction::None,
            EscalationAction::WarningStatus => OutcomeAction::WarningStatus,
            EscalationAction::OverdueStatus => OutcomeAction::OverdueStatus,
            EscalationAction::Suspended => OutcomeAction::Suspended,
        }
    }
}

/// What happened to the reminder for one obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderOutcome {
    NotDue,
    Sent,
    /// No usable contact profile; logged, not an error.
    Skipped,
    /// Another run already holds the dispatch slot for this milestone.
    AlreadyClaimed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationOutcome {
    pub transaction_id: TransactionId,
    pub lawyer_id: LawyerId,
    pub firm_name: Option<String>,
    pub days_overdue: u32,
    pub action: OutcomeAction,
    pub new_status: Option<RemittanceStatus>,
    pub reminder: ReminderOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Response payload of one compliance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_at: DateTime<Utc>,
    pub processed_count: usize,
    pub reminders_sent: usize,
    pub error_count: usize,
    pub details: Vec<ObligationOutcome>,
    pub aggregates: AggregateRefreshSummary,
}

impl RunReport {
    pub fn new(
        run_at: DateTime<Utc>,
        details: Vec<ObligationOutcome>,
        aggregates: AggregateRefreshSummary,
    ) -> Self {
        let reminders_sent = details
            .iter()
            .filter(|detail| detail.reminder == ReminderOutcome::Sent)
            .count();
        let error_count = details
            .iter()
            .filter(|detail| detail.action == OutcomeAction::Error)
            .count();

        Self {
            run_at,
            processed_count: details.len(),
            reminders_sent,
            error_count,
            details,
            aggregates,
        }
    }

    pub fn outcome_for(&self, transaction_id: &TransactionId) -> Option<&ObligationOutcome> {
        self.details
            .iter()
            .find(|detail| &detail.transaction_id == transaction_id)
    }
}
