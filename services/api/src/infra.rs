use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use remit_compliance::workflows::remittance::{
    AggregateError, AggregateRefresher, ComplianceCollaborators, LawyerComplianceRecord,
    LawyerContact, LawyerDirectory, LawyerId, NotifyError, ObligationStore, PageRequest,
    ReminderLedger, ReminderNotifier, ReminderPayload, RemittanceObligation, RepositoryError,
    StatusEscalation, TransactionId,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fee ledger entry; `paid` obligations drop out of the overdue set.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry {
    pub(crate) obligation: RemittanceObligation,
    pub(crate) paid: bool,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryObligationStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl InMemoryObligationStore {
    pub(crate) fn insert(&self, obligation: RemittanceObligation) {
        let mut guard = self.entries.lock().expect("ledger mutex poisoned");
        guard.push(LedgerEntry {
            obligation,
            paid: false,
        });
    }

    /// Settle an obligation; it leaves the overdue set and the outstanding total.
    pub(crate) fn mark_paid(&self, transaction_id: &TransactionId) -> bool {
        let mut guard = self.entries.lock().expect("ledger mutex poisoned");
        match guard
            .iter_mut()
            .find(|entry| &entry.obligation.transaction_id == transaction_id)
        {
            Some(entry) => {
                entry.paid = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn outstanding_for(&self, lawyer_id: &LawyerId) -> Decimal {
        let guard = self.entries.lock().expect("ledger mutex poisoned");
        guard
            .iter()
            .filter(|entry| !entry.paid && &entry.obligation.lawyer_id == lawyer_id)
            .map(|entry| entry.obligation.amount_due)
            .sum()
    }
}

impl ObligationStore for InMemoryObligationStore {
    fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<RemittanceObligation>, RepositoryError> {
        let today = now.date_naive();
        let guard = self.entries.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| !entry.paid && entry.obligation.due_date < today)
            .map(|entry| {
                let mut obligation = entry.obligation.clone();
                obligation.days_overdue = days_between(obligation.due_date, today);
                obligation
            })
            .collect())
    }

    fn record_reminder_sent(
        &self,
        transaction_id: &TransactionId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.entries.lock().expect("ledger mutex poisoned");
        let entry = guard
            .iter_mut()
            .find(|entry| &entry.obligation.transaction_id == transaction_id)
            .ok_or(RepositoryError::NotFound)?;
        entry.obligation.last_reminder_sent_at = Some(sent_at);
        Ok(())
    }
}

fn days_between(due: NaiveDate, today: NaiveDate) -> u32 {
    u32::try_from((today - due).num_days()).unwrap_or(0)
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLawyerDirectory {
    records: Arc<Mutex<BTreeMap<LawyerId, LawyerComplianceRecord>>>,
    contacts: Arc<Mutex<BTreeMap<LawyerId, LawyerContact>>>,
}

impl InMemoryLawyerDirectory {
    pub(crate) fn insert(&self, record: LawyerComplianceRecord, contact: Option<LawyerContact>) {
        let id = record.lawyer_id.clone();
        if let Some(contact) = contact {
            let mut contacts = self.contacts.lock().expect("contact mutex poisoned");
            contacts.insert(id.clone(), contact);
        }
        let mut records = self.records.lock().expect("directory mutex poisoned");
        records.insert(id, record);
    }

    pub(crate) fn set_outstanding_total(&self, lawyer_id: &LawyerId, total: Decimal) {
        let mut records = self.records.lock().expect("directory mutex poisoned");
        if let Some(record) = records.get_mut(lawyer_id) {
            record.outstanding_fees_total = total;
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<LawyerComplianceRecord> {
        let records = self.records.lock().expect("directory mutex poisoned");
        records.values().cloned().collect()
    }
}

impl LawyerDirectory for InMemoryLawyerDirectory {
    fn compliance_record(
        &self,
        lawyer_id: &LawyerId,
    ) -> Result<Option<LawyerComplianceRecord>, RepositoryError> {
        let records = self.records.lock().expect("directory mutex poisoned");
        Ok(records.get(lawyer_id).cloned())
    }

    fn escalate(&self, escalation: &StatusEscalation) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("directory mutex poisoned");
        let record = records
            .get_mut(&escalation.lawyer_id)
            .ok_or(RepositoryError::NotFound)?;
        record.apply(escalation);
        Ok(())
    }

    fn contact(&self, lawyer_id: &LawyerId) -> Result<Option<LawyerContact>, RepositoryError> {
        let contacts = self.contacts.lock().expect("contact mutex poisoned");
        Ok(contacts.get(lawyer_id).cloned())
    }

    fn lawyer_ids(&self, page: PageRequest) -> Result<Vec<LawyerId>, RepositoryError> {
        let records = self.records.lock().expect("directory mutex poisoned");
        Ok(records
            .keys()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }
}

/// Notifier that logs reminders instead of delivering them.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<ReminderPayload>>>,
}

impl LoggingNotifier {
    pub(crate) fn outbox(&self) -> Vec<ReminderPayload> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

impl ReminderNotifier for LoggingNotifier {
    fn send(&self, payload: &ReminderPayload) -> Result<(), NotifyError> {
        info!(
            to = %payload.to,
            transaction_ref = %payload.transaction_ref,
            amount_due = %payload.amount_due,
            days_overdue = payload.days_overdue,
            "reminder queued for delivery"
        );
        let mut guard = self.outbox.lock().expect("outbox mutex poisoned");
        guard.push(payload.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct LedgerAggregateRefresher {
    obligations: InMemoryObligationStore,
    directory: InMemoryLawyerDirectory,
}

impl AggregateRefresher for LedgerAggregateRefresher {
    fn recompute_outstanding(&self, lawyer_id: &LawyerId) -> Result<Decimal, AggregateError> {
        let total = self.obligations.outstanding_for(lawyer_id);
        self.directory.set_outstanding_total(lawyer_id, total);
        Ok(total)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReminderLedger {
    claims: Arc<Mutex<HashSet<(TransactionId, u32)>>>,
}

impl ReminderLedger for InMemoryReminderLedger {
    fn try_claim(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<bool, RepositoryError> {
        let mut claims = self.claims.lock().expect("ledger mutex poisoned");
        Ok(claims.insert((transaction_id.clone(), days_overdue)))
    }

    fn release(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<(), RepositoryError> {
        let mut claims = self.claims.lock().expect("ledger mutex poisoned");
        claims.remove(&(transaction_id.clone(), days_overdue));
        Ok(())
    }
}

/// Handles kept by the caller alongside the collaborators handed to the service.
pub(crate) struct InMemoryBackends {
    pub(crate) obligations: InMemoryObligationStore,
    pub(crate) directory: InMemoryLawyerDirectory,
    pub(crate) notifier: LoggingNotifier,
    pub(crate) ledger: InMemoryReminderLedger,
}

impl InMemoryBackends {
    pub(crate) fn new() -> Self {
        Self {
            obligations: InMemoryObligationStore::default(),
            directory: InMemoryLawyerDirectory::default(),
            notifier: LoggingNotifier::default(),
            ledger: InMemoryReminderLedger::default(),
        }
    }

    pub(crate) fn collaborators(&self) -> ComplianceCollaborators {
        ComplianceCollaborators {
            obligations: Arc::new(self.obligations.clone()),
            directory: Arc::new(self.directory.clone()),
            notifier: Arc::new(self.notifier.clone()),
            aggregates: Arc::new(LedgerAggregateRefresher {
                obligations: self.obligations.clone(),
                directory: self.directory.clone(),
            }),
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
