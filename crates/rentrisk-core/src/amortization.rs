use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RentRiskError;
use crate::types::{Money, Rate};
use crate::RentRiskResult;

/// Interest/principal split of twelve payments in one schedule year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualPaymentSplit {
    pub interest: Money,
    pub principal: Money,
}

fn validate_terms(principal: Money, annual_rate: Rate, term_years: u32) -> RentRiskResult<()> {
    if principal < Decimal::ZERO {
        return Err(RentRiskError::InvalidLoanTerms {
            field: "principal".into(),
            reason: "Loan principal cannot be negative".into(),
        });
    }
    if term_years == 0 {
        return Err(RentRiskError::InvalidLoanTerms {
            field: "term_years".into(),
            reason: "Loan term must be at least 1 year".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(RentRiskError::InvalidLoanTerms {
            field: "annual_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    Ok(())
}

/// Fixed monthly payment: P * r(1+r)^n / ((1+r)^n - 1).
///
/// A zero rate degenerates to straight-line amortization P/n, and a
/// zero principal (all-cash purchase) to a zero payment. Both are
/// valid financing scenarios, not errors.
pub fn monthly_payment(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
) -> RentRiskResult<Money> {
    validate_terms(principal, annual_rate, term_years)?;

    if principal.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let total_months = term_years * 12;
    let monthly_rate = annual_rate / Decimal::from(12);

    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(total_months));
    }

    // (1 + r)^n via iterative multiplication
    let mut compound = Decimal::ONE;
    for _ in 0..total_months {
        compound *= Decimal::ONE + monthly_rate;
    }

    let numerator = principal * monthly_rate * compound;
    let denominator = compound - Decimal::ONE;

    Ok(numerator / denominator)
}

/// Interest and principal paid during schedule year `year` (1-based),
/// obtained by walking the monthly amortization schedule.
pub fn annual_split(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    year: u32,
) -> RentRiskResult<AnnualPaymentSplit> {
    validate_terms(principal, annual_rate, term_years)?;

    if year == 0 || year > term_years {
        return Err(RentRiskError::InvalidLoanTerms {
            field: "year".into(),
            reason: format!("Schedule year must be between 1 and {term_years}"),
        });
    }

    if principal.is_zero() {
        return Ok(AnnualPaymentSplit {
            interest: Decimal::ZERO,
            principal: Decimal::ZERO,
        });
    }

    let payment = monthly_payment(principal, annual_rate, term_years)?;
    let monthly_rate = annual_rate / Decimal::from(12);

    let mut balance = principal;
    let mut year_interest = Decimal::ZERO;
    let mut year_principal = Decimal::ZERO;

    for month in 1..=(year * 12) {
        let interest = balance * monthly_rate;
        let mut principal_paid = payment - interest;
        // Final payment settles any residual from rounding
        if principal_paid > balance {
            principal_paid = balance;
        }
        balance -= principal_paid;

        if month > (year - 1) * 12 {
            year_interest += interest;
            year_principal += principal_paid;
        }
    }

    Ok(AnnualPaymentSplit {
        interest: year_interest,
        principal: year_principal,
    })
}
