use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::aggregate;
use super::cadence::{ReminderCadence, ReminderPayload};
use super::domain::{LawyerComplianceRecord, LawyerId, RemittanceObligation};
use super::escalation::{EscalationAction, EscalationPolicy};
use super::report::{ObligationOutcome, OutcomeAction, ReminderOutcome, RunReport};
use super::repository::{
    AggregateRefresher, LawyerDirectory, NotifyError, ObligationStore, ReminderLedger,
    ReminderNotifier, RepositoryError,
};
use crate::config::ComplianceConfig;

/// External systems the compliance run reads from and writes to.
#[derive(Clone)]
pub struct ComplianceCollaborators {
    pub obligations: Arc<dyn ObligationStore>,
    pub directory: Arc<dyn LawyerDirectory>,
    pub notifier: Arc<dyn ReminderNotifier>,
    pub aggregates: Arc<dyn AggregateRefresher>,
}

/// Orchestrates one pass over the overdue set: escalation, reminders, then aggregate refresh.
pub struct RemittanceComplianceService {
    collaborators: ComplianceCollaborators,
    ledger: Option<Arc<dyn ReminderLedger>>,
    policy: EscalationPolicy,
    cadence: ReminderCadence,
    dashboard_url: String,
    refresh_page_size: usize,
    in_flight: AtomicBool,
}

impl RemittanceComplianceService {
    pub fn new(collaborators: ComplianceCollaborators, config: &ComplianceConfig) -> Self {
        Self {
            collaborators,
            ledger: None,
            policy: EscalationPolicy::new(config.thresholds),
            cadence: ReminderCadence::new(config.cadence_mode),
            dashboard_url: config.dashboard_url.clone(),
            refresh_page_size: config.refresh_page_size,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claim each reminder slot before dispatch so overlapping runs send it once.
    pub fn with_reminder_ledger(mut self, ledger: Arc<dyn ReminderLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Execute one compliance run as of `now`.
    ///
    /// Only a failed obligation fetch (or a run already in flight) is returned as an error;
    /// per-obligation failures are folded into the report.
    pub fn run(&self, now: DateTime<Utc>) -> Result<RunReport, ComplianceRunError> {
        let _guard = RunGuard::acquire(&self.in_flight)?;

        let obligations = self
            .collaborators
            .obligations
            .overdue(now)
            .map_err(ComplianceRunError::ObligationFetch)?;
        info!(
            overdue = obligations.len(),
            cadence = ?self.cadence.mode(),
            "remittance compliance run started"
        );

        let mut working: HashMap<LawyerId, LawyerComplianceRecord> = HashMap::new();
        let details: Vec<ObligationOutcome> = obligations
            .iter()
            .map(|obligation| self.process(obligation, now, &mut working))
            .collect();

        let aggregates = aggregate::refresh_all(
            self.collaborators.directory.as_ref(),
            self.collaborators.aggregates.as_ref(),
            self.refresh_page_size,
        );

        let report = RunReport::new(now, details, aggregates);
        info!(
            processed = report.processed_count,
            reminders_sent = report.reminders_sent,
            errors = report.error_count,
            aggregates_refreshed = report.aggregates.refreshed,
            aggregates_failed = report.aggregates.failed,
            "remittance compliance run finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        obligation: &RemittanceObligation,
        now: DateTime<Utc>,
        working: &mut HashMap<LawyerId, LawyerComplianceRecord>,
    ) -> ObligationOutcome {
        let mut outcome = ObligationOutcome {
            transaction_id: obligation.transaction_id.clone(),
            lawyer_id: obligation.lawyer_id.clone(),
            firm_name: None,
            days_overdue: obligation.days_overdue,
            action: OutcomeAction::None,
            new_status: None,
            reminder: ReminderOutcome::NotDue,
            error: None,
        };

        // Later obligations for the same lawyer see this run's escalations.
        let record = match working.entry(obligation.lawyer_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                match self.collaborators.directory.compliance_record(entry.key()) {
                    Ok(Some(record)) => entry.insert(record),
                    Ok(None) => {
                        return failed(outcome, &RepositoryError::NotFound, "lawyer lookup")
                    }
                    Err(error) => return failed(outcome, &error, "lawyer lookup"),
                }
            }
        };
        outcome.firm_name = Some(record.firm_name.clone());
        outcome.new_status = Some(record.remittance_status);

        let decision = self
            .policy
            .evaluate(record.remittance_status, obligation.days_overdue);

        if let Some(escalation) = record.escalation_for(&decision, now) {
            if let Err(error) = self.collaborators.directory.escalate(&escalation) {
                return failed(outcome, &error, "status write");
            }
            record.apply(&escalation);
            info!(
                lawyer_id = %obligation.lawyer_id.0,
                transaction_id = %obligation.transaction_id.0,
                status = escalation.status.label(),
                days_overdue = obligation.days_overdue,
                "lawyer remittance status escalated"
            );
        }
        outcome.action = decision.action.into();
        outcome.new_status = Some(record.remittance_status);

        if !self.cadence.is_due(obligation, now) {
            debug!(
                transaction_id = %obligation.transaction_id.0,
                days_overdue = obligation.days_overdue,
                "no reminder due"
            );
            return outcome;
        }

        match self.dispatch_reminder(obligation, decision.action, now) {
            Ok(reminder) => outcome.reminder = reminder,
            Err(failure) => {
                outcome.reminder = failure.reminder_outcome();
                return failed(outcome, &failure, "reminder");
            }
        }
        outcome
    }

    fn dispatch_reminder(
        &self,
        obligation: &RemittanceObligation,
        action: EscalationAction,
        now: DateTime<Utc>,
    ) -> Result<ReminderOutcome, ReminderFailure> {
        let contact = match self.collaborators.directory.contact(&obligation.lawyer_id) {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(lawyer_id = %obligation.lawyer_id.0, "reminder skipped: no contact profile");
                return Ok(ReminderOutcome::Skipped);
            }
            Err(error) => {
                warn!(lawyer_id = %obligation.lawyer_id.0, %error, "reminder skipped: contact lookup failed");
                return Ok(ReminderOutcome::Skipped);
            }
        };

        if let Some(ledger) = &self.ledger {
            let claimed = ledger
                .try_claim(&obligation.transaction_id, obligation.days_overdue)
                .map_err(ReminderFailure::Claim)?;
            if !claimed {
                debug!(
                    transaction_id = %obligation.transaction_id.0,
                    days_overdue = obligation.days_overdue,
                    "reminder slot already claimed"
                );
                return Ok(ReminderOutcome::AlreadyClaimed);
            }
        }

        let payload = ReminderPayload::build(&contact, obligation, action, &self.dashboard_url);
        if let Err(error) = self.collaborators.notifier.send(&payload) {
            self.release_claim(obligation);
            return Err(ReminderFailure::Dispatch(error));
        }
        self.collaborators
            .obligations
            .record_reminder_sent(&obligation.transaction_id, now)
            .map_err(ReminderFailure::Marker)?;

        info!(
            transaction_id = %obligation.transaction_id.0,
            days_overdue = obligation.days_overdue,
            is_warning = payload.is_warning,
            is_suspension = payload.is_suspension,
            "remittance reminder sent"
        );
        Ok(ReminderOutcome::Sent)
    }

    fn release_claim(&self, obligation: &RemittanceObligation) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        if let Err(error) = ledger.release(&obligation.transaction_id, obligation.days_overdue) {
            warn!(
                transaction_id = %obligation.transaction_id.0,
                days_overdue = obligation.days_overdue,
                %error,
                "reminder slot release failed"
            );
        }
    }
}

fn failed(
    mut outcome: ObligationOutcome,
    error: &dyn std::error::Error,
    stage: &str,
) -> ObligationOutcome {
    warn!(
        transaction_id = %outcome.transaction_id.0,
        lawyer_id = %outcome.lawyer_id.0,
        stage,
        %error,
        "obligation processing failed"
    );
    outcome.action = OutcomeAction::Error;
    outcome.error = Some(format!("{stage}: {error}"));
    outcome
}

/// Holds the in-flight flag for the lifetime of one run.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ComplianceRunError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ComplianceRunError::RunInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, thiserror::Error)]
enum ReminderFailure {
    #[error("dispatch slot claim failed: {0}")]
    Claim(RepositoryError),
    #[error(transparent)]
    Dispatch(NotifyError),
    #[error("reminder sent but marker not persisted: {0}")]
    Marker(RepositoryError),
}

impl ReminderFailure {
    fn reminder_outcome(&self) -> ReminderOutcome {
        match self {
            ReminderFailure::Marker(_) => ReminderOutcome::Sent,
            ReminderFailure::Claim(_) | ReminderFailure::Dispatch(_) => ReminderOutcome::Failed,
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceRunError {
    #[error("failed to fetch overdue obligations: {0}")]
    ObligationFetch(#[source] RepositoryError),
    #[error("a compliance run is already in progress")]
    RunInProgress,
}
