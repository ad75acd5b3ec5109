use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::ComplianceConfig;
use crate::workflows::remittance::cadence::ReminderPayload;
use crate::workflows::remittance::domain::{
    LawyerComplianceRecord, LawyerContact, LawyerId, RemittanceObligation, RemittanceStatus,
    StatusEscalation, TransactionId,
};
use crate::workflows::remittance::repository::{
    AggregateError, AggregateRefresher, LawyerDirectory, NotifyError, ObligationStore,
    PageRequest, ReminderLedger, ReminderNotifier, RepositoryError,
};
use crate::workflows::remittance::service::{
    ComplianceCollaborators, RemittanceComplianceService,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 20, 6, 0, 0).unwrap()
}

pub(super) fn lawyer_id(id: &str) -> LawyerId {
    LawyerId(id.to_string())
}

pub(super) fn txn(id: &str) -> TransactionId {
    TransactionId(id.to_string())
}

pub(super) fn obligation(transaction: &str, lawyer: &str, days_overdue: u32) -> RemittanceObligation {
    RemittanceObligation {
        transaction_id: txn(transaction),
        lawyer_id: lawyer_id(lawyer),
        transaction_ref: format!("CONV-{}", transaction.to_ascii_uppercase()),
        amount_due: Decimal::from_str("1495.00").unwrap(),
        currency: "GBP".to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        days_overdue,
        last_reminder_sent_at: None,
    }
}

pub(super) fn record(lawyer: &str, status: RemittanceStatus) -> LawyerComplianceRecord {
    let mut record = LawyerComplianceRecord::new(lawyer_id(lawyer), format!("{lawyer} Conveyancing"));
    record.remittance_status = status;
    record
}

pub(super) fn contact(lawyer: &str) -> LawyerContact {
    LawyerContact {
        lawyer_id: lawyer_id(lawyer),
        full_name: format!("{lawyer} Solicitor"),
        firm_name: format!("{lawyer} Conveyancing"),
        email: format!("{lawyer}@firms.test"),
    }
}

pub(super) fn compliance_config() -> ComplianceConfig {
    ComplianceConfig {
        cron_secret: Some("cron-secret".to_string()),
        dashboard_url: "https://app.test/lawyer/dashboard".to_string(),
        ..ComplianceConfig::default()
    }
}

#[derive(Default)]
pub(super) struct MemoryObligations {
    obligations: Mutex<Vec<RemittanceObligation>>,
    fail_fetch: Mutex<bool>,
    fail_markers: Mutex<bool>,
    pub(super) fetches: AtomicUsize,
}

impl MemoryObligations {
    pub(super) fn with(obligations: Vec<RemittanceObligation>) -> Self {
        Self {
            obligations: Mutex::new(obligations),
            ..Self::default()
        }
    }

    pub(super) fn set_days_overdue(&self, days_overdue: u32) {
        for item in self.obligations.lock().expect("obligation mutex poisoned").iter_mut() {
            item.days_overdue = days_overdue;
        }
    }

    pub(super) fn fail_fetch(&self) {
        *self.fail_fetch.lock().expect("flag mutex poisoned") = true;
    }

    pub(super) fn fail_markers(&self) {
        *self.fail_markers.lock().expect("flag mutex poisoned") = true;
    }

    pub(super) fn marker(&self, transaction_id: &TransactionId) -> Option<DateTime<Utc>> {
        self.obligations
            .lock()
            .expect("obligation mutex poisoned")
            .iter()
            .find(|item| &item.transaction_id == transaction_id)
            .and_then(|item| item.last_reminder_sent_at)
    }
}

impl ObligationStore for MemoryObligations {
    fn overdue(&self, _now: DateTime<Utc>) -> Result<Vec<RemittanceObligation>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_fetch.lock().expect("flag mutex poisoned") {
            return Err(RepositoryError::Unavailable("ledger offline".to_string()));
        }
        Ok(self.obligations.lock().expect("obligation mutex poisoned").clone())
    }

    fn record_reminder_sent(
        &self,
        transaction_id: &TransactionId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if *self.fail_markers.lock().expect("flag mutex poisoned") {
            return Err(RepositoryError::Unavailable("marker write rejected".to_string()));
        }
        let mut guard = self.obligations.lock().expect("obligation mutex poisoned");
        let item = guard
            .iter_mut()
            .find(|item| &item.transaction_id == transaction_id)
            .ok_or(RepositoryError::NotFound)?;
        item.last_reminder_sent_at = Some(sent_at);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    records: Mutex<BTreeMap<LawyerId, LawyerComplianceRecord>>,
    contacts: Mutex<HashMap<LawyerId, LawyerContact>>,
    failing_lookups: Mutex<HashSet<LawyerId>>,
    failing_writes: Mutex<HashSet<LawyerId>>,
    fail_listing: Mutex<bool>,
    pub(super) escalations: Mutex<Vec<StatusEscalation>>,
    pub(super) pages: Mutex<Vec<PageRequest>>,
}

impl MemoryDirectory {
    pub(super) fn with(records: Vec<LawyerComplianceRecord>) -> Self {
        let directory = Self::default();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    pub(super) fn insert(&self, record: LawyerComplianceRecord) {
        let id = record.lawyer_id.clone();
        self.contacts
            .lock()
            .expect("contact mutex poisoned")
            .insert(id.clone(), contact(&id.0));
        self.records
            .lock()
            .expect("record mutex poisoned")
            .insert(id, record);
    }

    pub(super) fn remove_contact(&self, lawyer: &str) {
        self.contacts
            .lock()
            .expect("contact mutex poisoned")
            .remove(&lawyer_id(lawyer));
    }

    pub(super) fn fail_lookup(&self, lawyer: &str) {
        self.failing_lookups
            .lock()
            .expect("flag mutex poisoned")
            .insert(lawyer_id(lawyer));
    }

    pub(super) fn fail_write(&self, lawyer: &str) {
        self.failing_writes
            .lock()
            .expect("flag mutex poisoned")
            .insert(lawyer_id(lawyer));
    }

    pub(super) fn fail_listing(&self) {
        *self.fail_listing.lock().expect("flag mutex poisoned") = true;
    }

    pub(super) fn stored(&self, lawyer: &str) -> LawyerComplianceRecord {
        self.records
            .lock()
            .expect("record mutex poisoned")
            .get(&lawyer_id(lawyer))
            .cloned()
            .expect("lawyer present")
    }

    pub(super) fn escalation_count(&self) -> usize {
        self.escalations.lock().expect("escalation mutex poisoned").len()
    }
}

impl LawyerDirectory for MemoryDirectory {
    fn compliance_record(
        &self,
        lawyer_id: &LawyerId,
    ) -> Result<Option<LawyerComplianceRecord>, RepositoryError> {
        if self
            .failing_lookups
            .lock()
            .expect("flag mutex poisoned")
            .contains(lawyer_id)
        {
            return Err(RepositoryError::Unavailable("directory timeout".to_string()));
        }
        Ok(self
            .records
            .lock()
            .expect("record mutex poisoned")
            .get(lawyer_id)
            .cloned())
    }

    fn escalate(&self, escalation: &StatusEscalation) -> Result<(), RepositoryError> {
        if self
            .failing_writes
            .lock()
            .expect("flag mutex poisoned")
            .contains(&escalation.lawyer_id)
        {
            return Err(RepositoryError::Unavailable("write rejected".to_string()));
        }
        self.escalations
            .lock()
            .expect("escalation mutex poisoned")
            .push(escalation.clone());
        let mut guard = self.records.lock().expect("record mutex poisoned");
        let record = guard
            .get_mut(&escalation.lawyer_id)
            .ok_or(RepositoryError::NotFound)?;
        record.apply(escalation);
        Ok(())
    }

    fn contact(&self, lawyer_id: &LawyerId) -> Result<Option<LawyerContact>, RepositoryError> {
        Ok(self
            .contacts
            .lock()
            .expect("contact mutex poisoned")
            .get(lawyer_id)
            .cloned())
    }

    fn lawyer_ids(&self, page: PageRequest) -> Result<Vec<LawyerId>, RepositoryError> {
        self.pages.lock().expect("page mutex poisoned").push(page);
        if *self.fail_listing.lock().expect("flag mutex poisoned") {
            return Err(RepositoryError::Unavailable("listing failed".to_string()));
        }
        Ok(self
            .records
            .lock()
            .expect("record mutex poisoned")
            .keys()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<ReminderPayload>>,
    failing_recipients: Mutex<HashSet<String>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<ReminderPayload> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_for(&self, lawyer: &str) {
        self.failing_recipients
            .lock()
            .expect("flag mutex poisoned")
            .insert(contact(lawyer).email);
    }
}

impl ReminderNotifier for MemoryNotifier {
    fn send(&self, payload: &ReminderPayload) -> Result<(), NotifyError> {
        if self
            .failing_recipients
            .lock()
            .expect("flag mutex poisoned")
            .contains(&payload.to)
        {
            return Err(NotifyError::Transport("smtp relay refused".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryAggregates {
    refreshed: Mutex<Vec<LawyerId>>,
    failing: Mutex<HashSet<LawyerId>>,
}

impl MemoryAggregates {
    pub(super) fn refreshed(&self) -> Vec<LawyerId> {
        self.refreshed.lock().expect("aggregate mutex poisoned").clone()
    }

    pub(super) fn fail_for(&self, lawyer: &str) {
        self.failing
            .lock()
            .expect("flag mutex poisoned")
            .insert(lawyer_id(lawyer));
    }
}

impl AggregateRefresher for MemoryAggregates {
    fn recompute_outstanding(&self, lawyer_id: &LawyerId) -> Result<Decimal, AggregateError> {
        if self
            .failing
            .lock()
            .expect("flag mutex poisoned")
            .contains(lawyer_id)
        {
            return Err(AggregateError::Recompute {
                lawyer: lawyer_id.0.clone(),
                reason: "fee view unavailable".to_string(),
            });
        }
        self.refreshed
            .lock()
            .expect("aggregate mutex poisoned")
            .push(lawyer_id.clone());
        Ok(Decimal::ZERO)
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    claims: Mutex<HashSet<(TransactionId, u32)>>,
}

impl MemoryLedger {
    pub(super) fn is_claimed(&self, transaction: &str, days_overdue: u32) -> bool {
        self.claims
            .lock()
            .expect("ledger mutex poisoned")
            .contains(&(txn(transaction), days_overdue))
    }

    pub(super) fn pre_claim(&self, transaction: &str, days_overdue: u32) {
        self.claims
            .lock()
            .expect("ledger mutex poisoned")
            .insert((txn(transaction), days_overdue));
    }
}

impl ReminderLedger for MemoryLedger {
    fn try_claim(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .claims
            .lock()
            .expect("ledger mutex poisoned")
            .insert((transaction_id.clone(), days_overdue)))
    }

    fn release(
        &self,
        transaction_id: &TransactionId,
        days_overdue: u32,
    ) -> Result<(), RepositoryError> {
        self.claims
            .lock()
            .expect("ledger mutex poisoned")
            .remove(&(transaction_id.clone(), days_overdue));
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<RemittanceComplianceService>,
    pub(super) obligations: Arc<MemoryObligations>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) aggregates: Arc<MemoryAggregates>,
}

pub(super) fn harness(
    obligations: Vec<RemittanceObligation>,
    records: Vec<LawyerComplianceRecord>,
) -> Harness {
    harness_with(obligations, records, compliance_config(), None)
}

pub(super) fn harness_with(
    obligations: Vec<RemittanceObligation>,
    records: Vec<LawyerComplianceRecord>,
    config: ComplianceConfig,
    ledger: Option<Arc<MemoryLedger>>,
) -> Harness {
    let obligations = Arc::new(MemoryObligations::with(obligations));
    let directory = Arc::new(MemoryDirectory::with(records));
    let notifier = Arc::new(MemoryNotifier::default());
    let aggregates = Arc::new(MemoryAggregates::default());

    let collaborators = ComplianceCollaborators {
        obligations: obligations.clone(),
        directory: directory.clone(),
        notifier: notifier.clone(),
        aggregates: aggregates.clone(),
    };
    let mut service = RemittanceComplianceService::new(collaborators, &config);
    if let Some(ledger) = ledger {
        service = service.with_reminder_ledger(ledger);
    }

    Harness {
        service: Arc::new(service),
        obligations,
        directory,
        notifier,
        aggregates,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
