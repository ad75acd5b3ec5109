use crate::infra::{parse_date, InMemoryBackends};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use remit_compliance::config::ComplianceConfig;
use remit_compliance::error::AppError;
use remit_compliance::workflows::remittance::{
    CadenceMode, LawyerComplianceRecord, LawyerContact, LawyerId, RemittanceComplianceService,
    RemittanceObligation, RemittanceStatus, TransactionId,
};
use rust_decimal::Decimal;

#[derive(Args, Debug, Default)]
pub(crate) struct RunOnceArgs {
    /// Evaluate obligations as of this date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Reminder cadence: `exact` (default) or `catch-up`
    #[arg(long, value_parser = parse_cadence)]
    pub(crate) cadence: Option<CadenceMode>,
    /// Claim each reminder slot before dispatch
    #[arg(long)]
    pub(crate) exactly_once: bool,
}

fn parse_cadence(raw: &str) -> Result<CadenceMode, String> {
    CadenceMode::parse(raw).ok_or_else(|| format!("unknown cadence '{raw}' (expected exact|catch-up)"))
}

struct SeedLawyer {
    id: &'static str,
    name: &'static str,
    firm: &'static str,
    status: RemittanceStatus,
    has_contact: bool,
    stale_total: i64,
    obligations: &'static [(u64, i64)],
    settled: &'static [(u64, i64)],
}

/// Days overdue and fee amount per obligation, relative to the run date. `settled`
/// obligations are already paid and only count towards the stale displayed total.
const SEED: &[SeedLawyer] = &[
    SeedLawyer {
        id: "law-ashby",
        name: "Harriet Ashby",
        firm: "Ashby & Reed Conveyancing",
        status: RemittanceStatus::Current,
        has_contact: true,
        stale_total: 0,
        obligations: &[(28, 1195)],
        settled: &[],
    },
    SeedLawyer {
        id: "law-brook",
        name: "Daniel Brook",
        firm: "Brook Legal",
        status: RemittanceStatus::Warning,
        has_contact: true,
        stale_total: 0,
        obligations: &[(10, 995), (50, 1495)],
        settled: &[],
    },
    SeedLawyer {
        id: "law-carver",
        name: "Imogen Carver",
        firm: "Carver Property Law",
        status: RemittanceStatus::Overdue,
        has_contact: true,
        stale_total: 0,
        obligations: &[(60, 1250)],
        settled: &[],
    },
    SeedLawyer {
        id: "law-dunmore",
        name: "Owen Dunmore",
        firm: "Dunmore Solicitors",
        status: RemittanceStatus::Warning,
        has_contact: true,
        stale_total: 850,
        obligations: &[],
        settled: &[(70, 850)],
    },
    SeedLawyer {
        id: "law-ellis",
        name: "Grace Ellis",
        firm: "Ellis Home Moves",
        status: RemittanceStatus::Current,
        has_contact: false,
        stale_total: 0,
        obligations: &[(20, 1100)],
        settled: &[],
    },
];

/// Populate the in-memory backends with a small marketplace as of `as_of`.
pub(crate) fn seed(backends: &InMemoryBackends, as_of: NaiveDate) {
    for lawyer in SEED {
        let lawyer_id = LawyerId(lawyer.id.to_string());
        let mut record = LawyerComplianceRecord::new(lawyer_id.clone(), lawyer.firm);
        record.remittance_status = lawyer.status;
        record.outstanding_fees_total = Decimal::from(lawyer.stale_total);
        let contact = lawyer.has_contact.then(|| LawyerContact {
            lawyer_id: lawyer_id.clone(),
            full_name: lawyer.name.to_string(),
            firm_name: lawyer.firm.to_string(),
            email: format!("{}@example.co.uk", lawyer.id),
        });
        backends.directory.insert(record, contact);

        let entries = lawyer
            .obligations
            .iter()
            .map(|entry| (entry, false))
            .chain(lawyer.settled.iter().map(|entry| (entry, true)));
        for (index, ((days_overdue, amount), paid)) in entries.enumerate() {
            let Some(due_date) = as_of.checked_sub_days(Days::new(*days_overdue)) else {
                continue;
            };
            let transaction_id = TransactionId(format!("{}-txn-{}", lawyer.id, index + 1));
            backends.obligations.insert(RemittanceObligation {
                transaction_id: transaction_id.clone(),
                lawyer_id: lawyer_id.clone(),
                transaction_ref: format!("CONV-{}-{:03}", due_date.format("%Y%m"), index + 1),
                amount_due: Decimal::from(*amount),
                currency: "GBP".to_string(),
                due_date,
                days_overdue: 0,
                last_reminder_sent_at: None,
            });
            if paid {
                backends.obligations.mark_paid(&transaction_id);
            }
        }
    }
}

pub(crate) fn run_at(as_of: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&as_of.and_time(NaiveTime::MIN))
}

/// Execute one compliance run against seeded in-memory data and print the report.
pub(crate) fn run_once(args: RunOnceArgs) -> Result<(), AppError> {
    let RunOnceArgs {
        as_of,
        cadence,
        exactly_once,
    } = args;

    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let mut config = ComplianceConfig::default();
    if let Some(cadence) = cadence {
        config.cadence_mode = cadence;
    }

    let backends = InMemoryBackends::new();
    seed(&backends, as_of);

    let mut service = RemittanceComplianceService::new(backends.collaborators(), &config);
    if exactly_once {
        service = service.with_reminder_ledger(std::sync::Arc::new(backends.ledger.clone()));
    }

    let report = service.run(run_at(as_of))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    println!("\nLawyer standing after run");
    for record in backends.directory.snapshot() {
        println!(
            "- {:<28} {:<10} matching={:<5} outstanding={}",
            record.firm_name,
            record.remittance_status.label(),
            record.available_for_matching,
            record.outstanding_fees_total
        );
    }
    println!("\nReminders queued: {}", backends.notifier.outbox().len());

    Ok(())
}
