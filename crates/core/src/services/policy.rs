//! Access policy.
//!
//! Everything here is pure: callers load the rows, these functions decide.
//! Store queries narrow the rows but every status and date condition is
//! checked again here.

use campus_db::entities::{
    access_control_log::ReasonCode, payment_approval, semester_period,
    student_semester_registration, student_semester_registration::RegistrationStatus,
};
use campus_db::repositories::FinancialSummary;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Why access or registration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Statements exist, balance is zero, no approval.
    ZeroBalanceNoApproval,
    /// No approval covers today (never approved, rejected, revoked or expired).
    PaymentNotApproved,
    /// The period is not accepting registrations today.
    RegistrationWindowClosed,
}

impl DenialReason {
    /// Message shown to the caller.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ZeroBalanceNoApproval => {
                "zero balance but no payment approval — obtain approval from the accounts office."
            }
            Self::PaymentNotApproved => {
                "payment not approved, or access period expired — contact the accounts office."
            }
            Self::RegistrationWindowClosed => "registration window closed for this period",
        }
    }

    /// Reason code recorded in the audit log.
    #[must_use]
    pub const fn reason_code(self) -> ReasonCode {
        match self {
            Self::ZeroBalanceNoApproval => ReasonCode::ZeroBalanceNoApproval,
            Self::PaymentNotApproved => ReasonCode::PaymentNotApproved,
            Self::RegistrationWindowClosed => ReasonCode::RegistrationWindowClosed,
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Rows a decision is computed from.
#[derive(Debug, Clone, Default)]
pub struct PolicyInputs {
    pub financial: FinancialSummary,
    pub approvals: Vec<payment_approval::Model>,
    pub registrations: Vec<student_semester_registration::Model>,
    pub periods: Vec<semester_period::Model>,
}

/// Outcome of the payment check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentStanding {
    /// Approval that covers the day, if any. Latest `access_valid_until` wins.
    pub approval: Option<payment_approval::Model>,
}

impl PaymentStanding {
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        self.approval.is_some()
    }

    #[must_use]
    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.approval.as_ref().map(|a| a.access_valid_until)
    }

    #[must_use]
    pub fn approval_id(&self) -> Option<&str> {
        self.approval.as_ref().map(|a| a.id.as_str())
    }
}

/// The single authoritative access decision for one student on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessVerdict {
    pub has_access: bool,
    pub payment_approved: bool,
    pub semester_registered: bool,
    pub access_valid_until: Option<NaiveDate>,
    pub semester_end_date: Option<NaiveDate>,
    /// Empty when access is granted.
    pub denial_reason: String,
    pub financial_balance: Decimal,
    pub has_financial_statements: bool,
    pub payment_approval_id: Option<String>,
    pub semester_period_id: Option<String>,
    /// Structured form of `denial_reason`.
    pub denial: Option<DenialReason>,
    /// Day the decision was made for.
    pub evaluated_on: NaiveDate,
}

impl AccessVerdict {
    /// Audit reason code for this verdict.
    #[must_use]
    pub fn reason_code(&self) -> ReasonCode {
        self.denial
            .map_or(ReasonCode::Granted, DenialReason::reason_code)
    }
}

/// Pick the approval that makes the student eligible on `today`.
#[must_use]
pub fn payment_standing(approvals: &[payment_approval::Model], today: NaiveDate) -> PaymentStanding {
    let approval = approvals
        .iter()
        .filter(|a| a.is_effective_on(today))
        .max_by(|a, b| {
            a.access_valid_until
                .cmp(&b.access_valid_until)
                .then_with(|| a.id.cmp(&b.id))
        })
        .cloned();

    PaymentStanding { approval }
}

/// Pick the period the student is registered for on `today`.
///
/// Only approved registrations in active periods containing `today` count.
/// Among several, the latest-ending period wins, then the latest start date,
/// then the greatest id.
#[must_use]
pub fn current_registration<'a>(
    registrations: &[student_semester_registration::Model],
    periods: &'a [semester_period::Model],
    today: NaiveDate,
) -> Option<&'a semester_period::Model> {
    registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Approved)
        .filter_map(|r| periods.iter().find(|p| p.id == r.semester_period_id))
        .filter(|p| p.is_current_on(today))
        .max_by(|a, b| compare_periods(a, b))
}

/// Ordering used to break ties between overlapping active periods.
#[must_use]
pub fn compare_periods(a: &semester_period::Model, b: &semester_period::Model) -> std::cmp::Ordering {
    a.end_date
        .cmp(&b.end_date)
        .then_with(|| a.start_date.cmp(&b.start_date))
        .then_with(|| a.id.cmp(&b.id))
}

/// Denial rules, first match wins. `None` when payment is approved.
#[must_use]
pub fn payment_denial(financial: &FinancialSummary, payment_approved: bool) -> Option<DenialReason> {
    if payment_approved {
        return None;
    }
    if financial.has_statements() && financial.total_balance.is_zero() {
        Some(DenialReason::ZeroBalanceNoApproval)
    } else {
        Some(DenialReason::PaymentNotApproved)
    }
}

/// Grant rule.
///
/// A positive outstanding balance grants access without an approval. This
/// mirrors the institution's existing behaviour and is kept on purpose.
#[must_use]
pub fn grants_access(financial: &FinancialSummary, payment_approved: bool) -> bool {
    payment_approved || (financial.has_statements() && financial.total_balance > Decimal::ZERO)
}

/// Compute the verdict for `inputs` on `today`.
#[must_use]
pub fn decide(inputs: &PolicyInputs, today: NaiveDate) -> AccessVerdict {
    let payment = payment_standing(&inputs.approvals, today);
    let period = current_registration(&inputs.registrations, &inputs.periods, today);

    let payment_approved = payment.is_approved();
    let has_access = grants_access(&inputs.financial, payment_approved);
    let denial = if has_access {
        None
    } else {
        payment_denial(&inputs.financial, payment_approved)
    };

    AccessVerdict {
        has_access,
        payment_approved,
        semester_registered: period.is_some(),
        access_valid_until: payment.valid_until(),
        semester_end_date: period.map(|p| p.end_date),
        denial_reason: denial.map(|d| d.message().to_string()).unwrap_or_default(),
        financial_balance: inputs.financial.total_balance,
        has_financial_statements: inputs.financial.has_statements(),
        payment_approval_id: payment.approval_id().map(String::from),
        semester_period_id: period.map(|p| p.id.clone()),
        denial,
        evaluated_on: today,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_db::entities::payment_approval::PaymentApprovalStatus;
    use campus_db::test_utils::fixtures::{self, date};

    fn spring_approval(status: PaymentApprovalStatus) -> payment_approval::Model {
        fixtures::payment_approval(
            "pa1",
            "student1",
            status,
            date(2024, 1, 1),
            date(2024, 6, 30),
        )
    }

    fn summary(balances_cents: &[i64]) -> FinancialSummary {
        let records: Vec<_> = balances_cents
            .iter()
            .enumerate()
            .map(|(i, cents)| fixtures::financial_record(&format!("fr{i}"), "student1", *cents))
            .collect();
        FinancialSummary::from_records(&records)
    }

    #[test]
    fn test_no_rows_denied_payment_not_approved() {
        let verdict = decide(&PolicyInputs::default(), date(2024, 3, 15));

        assert!(!verdict.has_access);
        assert!(!verdict.payment_approved);
        assert!(!verdict.has_financial_statements);
        assert_eq!(verdict.denial, Some(DenialReason::PaymentNotApproved));
        assert!(verdict.denial_reason.starts_with("payment not approved"));
        assert_eq!(verdict.reason_code(), ReasonCode::PaymentNotApproved);
    }

    #[test]
    fn test_valid_approval_grants() {
        let inputs = PolicyInputs {
            approvals: vec![spring_approval(PaymentApprovalStatus::Approved)],
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(verdict.has_access);
        assert!(verdict.payment_approved);
        assert_eq!(verdict.access_valid_until, Some(date(2024, 6, 30)));
        assert_eq!(verdict.payment_approval_id.as_deref(), Some("pa1"));
        assert!(verdict.denial_reason.is_empty());
        assert_eq!(verdict.reason_code(), ReasonCode::Granted);
    }

    #[test]
    fn test_day_after_window_denied() {
        let inputs = PolicyInputs {
            approvals: vec![spring_approval(PaymentApprovalStatus::Approved)],
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 7, 1));

        assert!(!verdict.has_access);
        assert_eq!(verdict.denial, Some(DenialReason::PaymentNotApproved));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let inputs = PolicyInputs {
            approvals: vec![spring_approval(PaymentApprovalStatus::Approved)],
            ..Default::default()
        };

        assert!(decide(&inputs, date(2024, 6, 30)).payment_approved);
        assert!(decide(&inputs, date(2024, 1, 1)).payment_approved);
        assert!(!decide(&inputs, date(2023, 12, 31)).payment_approved);
    }

    #[test]
    fn test_non_approved_statuses_never_match() {
        for status in [
            PaymentApprovalStatus::Pending,
            PaymentApprovalStatus::Rejected,
            PaymentApprovalStatus::Revoked,
            PaymentApprovalStatus::Expired,
        ] {
            let inputs = PolicyInputs {
                approvals: vec![spring_approval(status)],
                ..Default::default()
            };
            let verdict = decide(&inputs, date(2024, 3, 15));
            assert!(!verdict.payment_approved, "{status:?} must not grant");
            assert!(!verdict.has_access);
        }
    }

    #[test]
    fn test_payment_grants_without_registration() {
        let inputs = PolicyInputs {
            approvals: vec![spring_approval(PaymentApprovalStatus::Approved)],
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(!verdict.semester_registered);
        assert!(verdict.has_access);
    }

    #[test]
    fn test_zero_balance_without_approval() {
        let inputs = PolicyInputs {
            financial: summary(&[5_000, -5_000]),
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(!verdict.has_access);
        assert!(verdict.has_financial_statements);
        assert_eq!(verdict.denial, Some(DenialReason::ZeroBalanceNoApproval));
        assert!(verdict.denial_reason.starts_with("zero balance"));
    }

    #[test]
    fn test_positive_balance_grants_without_approval() {
        let inputs = PolicyInputs {
            financial: summary(&[12_500]),
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(verdict.has_access);
        assert!(!verdict.payment_approved);
        assert!(verdict.denial.is_none());
        assert_eq!(verdict.financial_balance, Decimal::new(12_500, 2));
    }

    #[test]
    fn test_negative_balance_denied() {
        let inputs = PolicyInputs {
            financial: summary(&[-100]),
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(!verdict.has_access);
        assert_eq!(verdict.denial, Some(DenialReason::PaymentNotApproved));
    }

    #[test]
    fn test_latest_valid_until_reported() {
        let later = fixtures::payment_approval(
            "pa2",
            "student1",
            PaymentApprovalStatus::Approved,
            date(2024, 2, 1),
            date(2024, 8, 31),
        );
        let inputs = PolicyInputs {
            approvals: vec![spring_approval(PaymentApprovalStatus::Approved), later],
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert_eq!(verdict.access_valid_until, Some(date(2024, 8, 31)));
        assert_eq!(verdict.payment_approval_id.as_deref(), Some("pa2"));
    }

    #[test]
    fn test_latest_ending_active_period_wins() {
        let early = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let late = fixtures::semester_period("sp2", date(2024, 2, 1), date(2024, 7, 15));
        let mut inactive = fixtures::semester_period("sp3", date(2024, 1, 1), date(2024, 12, 31));
        inactive.is_active = false;

        let registrations = ["sp1", "sp2", "sp3"]
            .iter()
            .enumerate()
            .map(|(i, period)| {
                fixtures::registration(
                    &format!("reg{i}"),
                    "student1",
                    period,
                    RegistrationStatus::Approved,
                )
            })
            .collect();

        let inputs = PolicyInputs {
            registrations,
            periods: vec![early, late, inactive],
            ..Default::default()
        };
        let verdict = decide(&inputs, date(2024, 3, 15));

        assert!(verdict.semester_registered);
        assert_eq!(verdict.semester_period_id.as_deref(), Some("sp2"));
        assert_eq!(verdict.semester_end_date, Some(date(2024, 7, 15)));
    }

    #[test]
    fn test_pending_registration_not_counted() {
        let period = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let inputs = PolicyInputs {
            registrations: vec![fixtures::registration(
                "reg1",
                "student1",
                "sp1",
                RegistrationStatus::Pending,
            )],
            periods: vec![period],
            ..Default::default()
        };

        assert!(!decide(&inputs, date(2024, 3, 15)).semester_registered);
    }

    #[test]
    fn test_period_tie_breaks_on_start_then_id() {
        let a = fixtures::semester_period("sp-a", date(2024, 1, 8), date(2024, 5, 31));
        let b = fixtures::semester_period("sp-b", date(2024, 1, 8), date(2024, 5, 31));
        let c = fixtures::semester_period("sp-c", date(2024, 1, 1), date(2024, 5, 31));

        assert_eq!(compare_periods(&b, &a), std::cmp::Ordering::Greater);
        assert_eq!(compare_periods(&a, &c), std::cmp::Ordering::Greater);
    }

    #[test]
    fn test_payment_denial_none_when_approved() {
        assert_eq!(payment_denial(&summary(&[0]), true), None);
        assert_eq!(
            payment_denial(&summary(&[0]), false),
            Some(DenialReason::ZeroBalanceNoApproval)
        );
        assert_eq!(
            payment_denial(&FinancialSummary::default(), false),
            Some(DenialReason::PaymentNotApproved)
        );
    }
}
