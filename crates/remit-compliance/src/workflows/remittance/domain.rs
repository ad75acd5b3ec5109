use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::escalation::{EscalationAction, EscalationDecision};

/// Identifier wrapper for a lawyer on the platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LawyerId(pub String);

/// Identifier wrapper for the transaction that owes a platform fee.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

/// Compliance states ordered by severity. Declaration order is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceStatus {
    Current,
    Warning,
    Overdue,
    Suspended,
}

impl RemittanceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RemittanceStatus::Current => "current",
            RemittanceStatus::Warning => "warning",
            RemittanceStatus::Overdue => "overdue",
            RemittanceStatus::Suspended => "suspended",
        }
    }
}

/// One transaction's outstanding platform fee, as reported by the obligation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceObligation {
    pub transaction_id: TransactionId,
    pub lawyer_id: LawyerId,
    pub transaction_ref: String,
    pub amount_due: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    /// Authoritative value from the store; never recomputed here.
    pub days_overdue: u32,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
}

/// A lawyer's compliance standing as held by the lawyer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerComplianceRecord {
    pub lawyer_id: LawyerId,
    pub firm_name: String,
    pub remittance_status: RemittanceStatus,
    pub suspended_for_non_payment: bool,
    pub suspension_date: Option<DateTime<Utc>>,
    pub available_for_matching: bool,
    pub outstanding_fees_total: Decimal,
}

impl LawyerComplianceRecord {
    pub fn new(lawyer_id: LawyerId, firm_name: impl Into<String>) -> Self {
        Self {
            lawyer_id,
            firm_name: firm_name.into(),
            remittance_status: RemittanceStatus::Current,
            suspended_for_non_payment: false,
            suspension_date: None,
            available_for_matching: true,
            outstanding_fees_total: Decimal::ZERO,
        }
    }

    /// Derive the directory write a decision implies, without mutating the record.
    ///
    /// Returns `None` when the decision would not raise the stored status. Entering
    /// suspension always stamps `now`; a record already suspended never gets here.
    pub fn escalation_for(
        &self,
        decision: &EscalationDecision,
        now: DateTime<Utc>,
    ) -> Option<StatusEscalation> {
        if decision.target <= self.remittance_status {
            return None;
        }

        let suspend = decision.action == EscalationAction::Suspended;
        Some(StatusEscalation {
            lawyer_id: self.lawyer_id.clone(),
            status: decision.target,
            suspension_date: suspend.then_some(now),
        })
    }

    /// Fold a committed escalation into this record. Lower or equal severities are ignored,
    /// so a suspended record keeps its `suspension_date`.
    pub fn apply(&mut self, escalation: &StatusEscalation) -> bool {
        if escalation.status <= self.remittance_status {
            return false;
        }

        self.remittance_status = escalation.status;
        if escalation.status == RemittanceStatus::Suspended {
            self.suspended_for_non_payment = true;
            self.available_for_matching = false;
            self.suspension_date = escalation.suspension_date;
        }
        true
    }
}

/// Monotonic write sent to the lawyer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEscalation {
    pub lawyer_id: LawyerId,
    pub status: RemittanceStatus,
    /// Present only when `status` is `Suspended`.
    pub suspension_date: Option<DateTime<Utc>>,
}

/// Contact details used to address a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerContact {
    pub lawyer_id: LawyerId,
    pub full_name: String,
    pub firm_name: String,
    pub email: String,
}
