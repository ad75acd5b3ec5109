use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::cadence::ReminderPayload;
use super::domain::{
    LawyerComplianceRecord, LawyerContact, LawyerId, RemittanceObligation, StatusEscalation,
    TransactionId,
};

/// Source of overdue fee obligations and owner of the per-obligation reminder marker.
pub trait ObligationStore: Send + Sync {
    /// Every obligation overdue as of `now`, with `days_overdue` already computed.
    /// Repeated calls with the same `now` must return the same set.
    fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<RemittanceObligation>, RepositoryError>;

    fn record_reminder_sent(
        &self,
        transaction_id: &TransactionId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Storage abstraction over lawyer compliance records and contact profiles.
///
/// `escalate` must be idempotent and monotonic: an escalation that is not more severe than
/// the stored status is a no-op, so a suspended lawyer's `suspension_date` is never overwritten.
pub trait LawyerDirectory: Send + Sync {
    fn compliance_record(
        &self,
        lawyer_id: &LawyerId,
    ) -> Result<Option<LawyerComplianceRecord>, RepositoryError>;

    fn escalate(&self, escalation: &StatusEscalation) -> Result<(), RepositoryError>;

    fn contact(&self, lawyer_id: &LawyerId) -> Result<Option<LawyerContact>, RepositoryError>;

    /// One page of every lawyer id in the directory, in a stable order.
    fn lawyer_ids(&self, page: PageRequest) -> Result<Vec<LawyerId>, RepositoryError>;
}

/// Offset pagination for directory scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Outbound reminder hook (e-mail or messaging adapters).
pub trait ReminderNotifier: Send + Sync {
    fn send(&self, payload: &ReminderPayload) -> Result<(), NotifyError>;
}

/// Recalculates the display-only outstanding fees total for one lawyer.
pub trait AggregateRefresher: Send + Sync {
    fn recompute_outstanding(&self, lawyer_id: &LawyerId) -> Result<Decimal, AggregateError>;
}

/// Compare-and-set claim on a reminder slot keyed by `(transaction_id, days_overdue)`.
///
/// `try_claim` returns `true` for exactly one caller per key until that claim is released.
pub trait ReminderLedger: Send + Sync {
    fn try_claim(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<bool, RepositoryError>;

    /// Give back a claim whose reminder never left, so a later run can send it.
    fn release(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Reminder dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("outstanding fee recomputation failed for {lawyer}: {reason}")]
    Recompute { lawyer: String, reason: String },
}
