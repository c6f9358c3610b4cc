//! # Obligation rules
//!
//! Pure money and calendar rules shared by the obligation repository and the
//! reporting engine: amount validation, installment splitting, due-date
//! schedules and the runtime (as-of) status projection.
//!
//! ```
//! use bookkeeping::ledger::plan_installments;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let first = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let plan = plan_installments(dec!(100.00), 3, first, 30).unwrap();
//! let amounts: Vec<_> = plan.iter().map(|i| i.amount).collect();
//! assert_eq!(amounts, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
//! ```

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::LedgerError;
use crate::models::obligation::ObligationStatus;

/// Fractional digits carried by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount the `NUMERIC(15, 2)` money columns hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_7FFF, 0x0003_8D7E, 0, false, MONEY_SCALE); // 999_999_999_999_999 x 10^-2

/// Upper bound on installments in a single plan.
pub const MAX_INSTALLMENTS: u32 = 360;

/// One row of an installment plan before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstallment {
    /// 1-based
    pub index: u32,
    pub count: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Rejects non-positive amounts, amounts finer than a cent and amounts beyond
/// [`MAX_AMOUNT`].
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::validation(format!(
            "amount must not exceed {MAX_AMOUNT}, got {amount}"
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::validation(format!(
            "amount must have at most {MONEY_SCALE} decimal places, got {amount}"
        )));
    }
    Ok(amount.round_dp(MONEY_SCALE))
}

/// Splits `total` into `count` parts of equal cents, the remainder going to the
/// last part. The parts always sum to `total` exactly.
pub fn split_amount(total: Decimal, count: u32) -> Result<Vec<Decimal>, LedgerError> {
    let total = validate_amount(total)?;
    validate_installment_count(count)?;

    let divisor = Decimal::from(count);
    let base = (total / divisor).round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero);
    if base < Decimal::new(1, MONEY_SCALE) {
        return Err(LedgerError::validation(format!(
            "{total} cannot be split into {count} installments of at least 0.01"
        )));
    }

    let last = total - base * Decimal::from(count - 1);
    let mut parts = vec![base; count as usize - 1];
    parts.push(last);
    Ok(parts)
}

/// Due dates `first + k * interval_days` for `k = 0..count`.
pub fn installment_schedule(
    first_due_date: NaiveDate,
    count: u32,
    interval_days: u32,
) -> Result<Vec<NaiveDate>, LedgerError> {
    if interval_days == 0 {
        return Err(LedgerError::validation("interval_days must be positive"));
    }

    (0..count)
        .map(|k| {
            first_due_date
                .checked_add_days(Days::new(u64::from(k) * u64::from(interval_days)))
                .ok_or_else(|| LedgerError::validation("installment schedule exceeds the calendar"))
        })
        .collect()
}

/// Amounts and due dates of an installment plan, ordered by index.
pub fn plan_installments(
    total: Decimal,
    count: u32,
    first_due_date: NaiveDate,
    interval_days: u32,
) -> Result<Vec<PlannedInstallment>, LedgerError> {
    let amounts = split_amount(total, count)?;
    let dates = installment_schedule(first_due_date, count, interval_days)?;

    Ok(amounts
        .into_iter()
        .zip(dates)
        .enumerate()
        .map(|(i, (amount, due_date))| PlannedInstallment {
            index: i as u32 + 1,
            count,
            amount,
            due_date,
        })
        .collect())
}

fn validate_installment_count(count: u32) -> Result<(), LedgerError> {
    if count < 2 {
        return Err(LedgerError::validation(format!(
            "installment_count must be at least 2, got {count}"
        )));
    }
    if count > MAX_INSTALLMENTS {
        return Err(LedgerError::validation(format!(
            "installment_count must not exceed {MAX_INSTALLMENTS}, got {count}"
        )));
    }
    Ok(())
}

/// Settled and cancelled rows keep their status; anything else is overdue
/// once `due_date` is strictly before `as_of`.
pub fn derive_runtime_status(
    status: ObligationStatus,
    due_date: NaiveDate,
    as_of: NaiveDate,
) -> ObligationStatus {
    if status.is_terminal() {
        status
    } else if due_date < as_of {
        ObligationStatus::Overdue
    } else {
        ObligationStatus::Pending
    }
}

/// Whole days between `due_date` and `as_of`; zero when not yet due.
pub fn days_overdue(due_date: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - due_date).num_days().max(0)
}
