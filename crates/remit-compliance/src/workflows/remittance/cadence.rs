use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::domain::{LawyerContact, RemittanceObligation};
use super::escalation::EscalationAction;

/// Days overdue at which a reminder goes out.
pub const REMINDER_MILESTONES: [u32; 8] = [1, 10, 20, 28, 35, 45, 55, 60];

/// Reminders at or beyond this many days carry the warning styling.
pub const WARNING_NOTICE_DAYS: u32 = 30;

/// How milestone membership is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CadenceMode {
    /// Due only when `days_overdue` equals a milestone. A run missed on that day skips it.
    #[default]
    ExactMatch,
    /// Due when the latest milestone reached has not been reminded since it was reached.
    CatchUp,
}

impl CadenceMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" | "exact-match" => Some(Self::ExactMatch),
            "catch-up" | "catchup" => Some(Self::CatchUp),
            _ => None,
        }
    }
}

/// Decides whether an obligation is owed a reminder on a given run.
#[derive(Debug, Clone)]
pub struct ReminderCadence {
    milestones: Vec<u32>,
    mode: CadenceMode,
}

impl Default for ReminderCadence {
    fn default() -> Self {
        Self::new(CadenceMode::default())
    }
}

impl ReminderCadence {
    pub fn new(mode: CadenceMode) -> Self {
        Self {
            milestones: REMINDER_MILESTONES.to_vec(),
            mode,
        }
    }

    pub fn mode(&self) -> CadenceMode {
        self.mode
    }

    pub fn is_due(&self, obligation: &RemittanceObligation, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if let Some(sent_at) = obligation.last_reminder_sent_at {
            if sent_at.date_naive() == today {
                return false;
            }
        }

        match self.mode {
            CadenceMode::ExactMatch => self.milestones.contains(&obligation.days_overdue),
            CadenceMode::CatchUp => {
                let Some(milestone) = self.latest_reached(obligation.days_overdue) else {
                    return false;
                };
                let since_milestone = u64::from(obligation.days_overdue - milestone);
                let Some(reached_on) = today.checked_sub_days(Days::new(since_milestone)) else {
                    return false;
                };
                match obligation.last_reminder_sent_at {
                    Some(sent_at) => sent_at.date_naive() < reached_on,
                    None => true,
                }
            }
        }
    }

    fn latest_reached(&self, days_overdue: u32) -> Option<u32> {
        self.milestones
            .iter()
            .copied()
            .filter(|milestone| *milestone <= days_overdue)
            .max()
    }
}

/// Structured reminder handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub to: String,
    pub lawyer_name: String,
    pub firm_name: String,
    pub transaction_ref: String,
    pub amount_due: String,
    pub days_overdue: u32,
    pub due_date: String,
    pub dashboard_url: String,
    pub is_warning: bool,
    pub is_suspension: bool,
}

impl ReminderPayload {
    pub fn build(
        contact: &LawyerContact,
        obligation: &RemittanceObligation,
        action: EscalationAction,
        dashboard_url: &str,
    ) -> Self {
        Self {
            to: contact.email.clone(),
            lawyer_name: contact.full_name.clone(),
            firm_name: contact.firm_name.clone(),
            transaction_ref: obligation.transaction_ref.clone(),
            amount_due: format_amount(obligation.amount_due, &obligation.currency),
            days_overdue: obligation.days_overdue,
            due_date: format_due_date(obligation.due_date),
            dashboard_url: dashboard_url.to_string(),
            is_warning: obligation.days_overdue >= WARNING_NOTICE_DAYS,
            is_suspension: action == EscalationAction::Suspended,
        }
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Some("£"),
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "AUD" => Some("A$"),
        "NZD" => Some("NZ$"),
        "CAD" => Some("C$"),
        _ => None,
    }
}

/// Render an amount as `£1,250.00`; unknown currencies render as `CHF 1,250.00`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match currency_symbol(currency) {
        Some(symbol) => format!("{sign}{symbol}{grouped}.{fraction}"),
        None => format!(
            "{sign}{} {grouped}.{fraction}",
            currency.trim().to_ascii_uppercase()
        ),
    }
}

fn format_due_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}
