use serde::{Deserialize, Serialize};

use super::domain::RemittanceStatus;

/// Day counts at which an overdue obligation moves a lawyer to the next status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationThresholds {
    pub warning_days: u32,
    pub overdue_days: u32,
    pub suspension_days: u32,
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            warning_days: 15,
            overdue_days: 45,
            suspension_days: 60,
        }
    }
}

impl EscalationThresholds {
    pub fn is_ascending(&self) -> bool {
        self.warning_days < self.overdue_days && self.overdue_days < self.suspension_days
    }

    /// Status implied by `days_overdue` alone, checked from most to least severe.
    pub fn implied_status(&self, days_overdue: u32) -> RemittanceStatus {
        if days_overdue >= self.suspension_days {
            RemittanceStatus::Suspended
        } else if days_overdue >= self.overdue_days {
            RemittanceStatus::Overdue
        } else if days_overdue >= self.warning_days {
            RemittanceStatus::Warning
        } else {
            RemittanceStatus::Current
        }
    }
}

/// What a single obligation did to its lawyer's standing during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    None,
    WarningStatus,
    OverdueStatus,
    Suspended,
}

impl EscalationAction {
    fn entering(status: RemittanceStatus) -> Self {
        match status {
            RemittanceStatus::Current => EscalationAction::None,
            RemittanceStatus::Warning => EscalationAction::WarningStatus,
            RemittanceStatus::Overdue => EscalationAction::OverdueStatus,
            RemittanceStatus::Suspended => EscalationAction::Suspended,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationDecision {
    pub target: RemittanceStatus,
    pub action: EscalationAction,
}

impl EscalationDecision {
    pub fn changes_status(&self) -> bool {
        self.action != EscalationAction::None
    }
}

/// Pure mapping from (current status, days overdue) to the status a lawyer should hold.
#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    thresholds: EscalationThresholds,
}

impl EscalationPolicy {
    pub fn new(thresholds: EscalationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EscalationThresholds {
        &self.thresholds
    }

    /// Never returns a target below `current`.
    pub fn evaluate(&self, current: RemittanceStatus, days_overdue: u32) -> EscalationDecision {
        let implied = self.thresholds.implied_status(days_overdue);
        if implied > current {
            EscalationDecision {
                target: implied,
                action: EscalationAction::entering(implied),
            }
        } else {
            EscalationDecision {
                target: current,
                action: EscalationAction::None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RemittanceStatus::*;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::default()
    }

    #[test]
    fn boundaries_follow_threshold_table() {
        let cases = [
            (0, Current),
            (14, Current),
            (15, Warning),
            (44, Warning),
            (45, Overdue),
            (59, Overdue),
            (60, Suspended),
            (400, Suspended),
        ];
        for (days, expected) in cases {
            assert_eq!(
                policy().evaluate(Current, days).target,
                expected,
                "days_overdue = {days}"
            );
        }
    }

    #[test]
    fn never_downgrades_current_status() {
        for current in [Current, Warning, Overdue, Suspended] {
            for days in [0, 14, 15, 44, 45, 59, 60, 90] {
                let decision = policy().evaluate(current, days);
                assert!(decision.target >= current, "{current:?} at {days} days");
            }
        }
    }

    #[test]
    fn already_at_target_is_no_action() {
        let decision = policy().evaluate(Warning, 20);
        assert_eq!(decision.target, Warning);
        assert_eq!(decision.action, EscalationAction::None);
        assert!(!decision.changes_status());

        let decision = policy().evaluate(Suspended, 75);
        assert_eq!(decision.action, EscalationAction::None);
    }

    #[test]
    fn skips_straight_to_suspension() {
        let decision = policy().evaluate(Current, 61);
        assert_eq!(decision.target, Suspended);
        assert_eq!(decision.action, EscalationAction::Suspended);
    }

    #[test]
    fn cumulative_application_keeps_worst_severity() {
        let after_first = policy().evaluate(Current, 50).target;
        let after_second = policy().evaluate(after_first, 10).target;
        assert_eq!(after_second, Overdue);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let policy = EscalationPolicy::new(EscalationThresholds {
            warning_days: 7,
            overdue_days: 21,
            suspension_days: 30,
        });
        assert_eq!(policy.evaluate(Current, 7).target, Warning);
        assert_eq!(policy.evaluate(Current, 30).target, Suspended);
    }
}
