use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RentRiskError;
use crate::RentRiskResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Immutable financial description of a single rental property.
///
/// Expenses are a mapping from free-form category names (taxes,
/// insurance, maintenance, management, HOA, ...) to monthly amounts.
/// The map is validated at the boundary; categories themselves are
/// not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFinancials {
    /// Acquisition price
    pub purchase_price: Money,
    /// Fraction of the price paid up front (0.20 = 20% down; 1.0 = all cash)
    pub down_payment_fraction: Rate,
    /// Annual mortgage interest rate
    pub annual_interest_rate: Rate,
    /// Amortization term in years
    pub loan_term_years: u32,
    /// Scheduled monthly rent before vacancy
    pub monthly_gross_rent: Money,
    /// Monthly operating expenses by category (excluding debt service)
    pub monthly_expenses: BTreeMap<String, Money>,
    /// Baseline vacancy and collection loss rate
    pub vacancy_rate: Rate,
    /// One-time acquisition costs (closing costs etc.), part of cash invested
    #[serde(default)]
    pub one_time_costs: Money,
    /// Default projection horizon in years
    #[serde(default = "default_holding_period")]
    pub holding_period_years: u32,
}

fn default_holding_period() -> u32 {
    10
}

impl PropertyFinancials {
    /// Cash paid up front, excluding one-time costs.
    pub fn down_payment(&self) -> Money {
        self.purchase_price * self.down_payment_fraction
    }

    /// Financed amount: price x (1 - down-payment fraction).
    pub fn loan_principal(&self) -> Money {
        self.purchase_price * (Decimal::ONE - self.down_payment_fraction)
    }

    /// Scheduled annual rent before vacancy.
    pub fn annual_gross_rent(&self) -> Money {
        self.monthly_gross_rent * Decimal::from(12)
    }

    /// Sum of the monthly expense map.
    pub fn monthly_operating_expenses(&self) -> Money {
        self.monthly_expenses.values().copied().sum()
    }

    /// Eager boundary validation. Caller inputs outside their domain
    /// are rejected, never clamped.
    pub fn validate(&self) -> RentRiskResult<()> {
        if self.purchase_price <= Decimal::ZERO {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "purchase_price".into(),
                reason: "Purchase price must be positive".into(),
            });
        }

        if self.down_payment_fraction < Decimal::ZERO || self.down_payment_fraction > Decimal::ONE
        {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "down_payment_fraction".into(),
                reason: "Down-payment fraction must be between 0 and 1".into(),
            });
        }

        if self.monthly_gross_rent < Decimal::ZERO {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "monthly_gross_rent".into(),
                reason: "Monthly rent cannot be negative".into(),
            });
        }

        for (category, amount) in &self.monthly_expenses {
            if *amount < Decimal::ZERO {
                return Err(RentRiskError::InvalidPropertyFinancials {
                    field: format!("monthly_expenses.{category}"),
                    reason: "Expense amounts cannot be negative".into(),
                });
            }
        }

        if self.vacancy_rate < Decimal::ZERO || self.vacancy_rate > Decimal::ONE {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "vacancy_rate".into(),
                reason: "Vacancy rate must be between 0 and 1".into(),
            });
        }

        if self.one_time_costs < Decimal::ZERO {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "one_time_costs".into(),
                reason: "One-time costs cannot be negative".into(),
            });
        }

        if self.holding_period_years < 1 {
            return Err(RentRiskError::InvalidPropertyFinancials {
                field: "holding_period_years".into(),
                reason: "Holding period must be at least 1 year".into(),
            });
        }

        if self.annual_interest_rate < Decimal::ZERO {
            return Err(RentRiskError::InvalidLoanTerms {
                field: "annual_interest_rate".into(),
                reason: "Interest rate cannot be negative".into(),
            });
        }

        if self.loan_term_years < 1 {
            return Err(RentRiskError::InvalidLoanTerms {
                field: "loan_term_years".into(),
                reason: "Loan term must be at least 1 year".into(),
            });
        }

        Ok(())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
