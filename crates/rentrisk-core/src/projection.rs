use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization;
use crate::error::RentRiskError;
use crate::types::{with_metadata, ComputationOutput, Money, PropertyFinancials, Rate};
use crate::RentRiskResult;

/// Annual growth assumptions for a deterministic projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthAssumptions {
    /// Annual rent growth rate (compounding)
    pub rent_growth: Rate,
    /// Annual expense growth rate (compounding)
    pub expense_growth: Rate,
}

/// One projected year of operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearCashFlow {
    pub year: u32,
    pub gross_rent: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub cash_flow: Money,
}

/// Ordered multi-year cash-flow projection for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub years: Vec<YearCashFlow>,
    /// Sum of all per-year cash flows over the holding period
    pub cumulative_cash_flow: Money,
}

fn validate_growth(growth: &GrowthAssumptions) -> RentRiskResult<()> {
    if growth.rent_growth <= dec!(-1) {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "rent_growth".into(),
            reason: "Rent growth must be greater than -100%".into(),
        });
    }
    if growth.expense_growth <= dec!(-1) {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "expense_growth".into(),
            reason: "Expense growth must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Project per-year cash flows across the property's holding period.
///
/// Year 1 is the baseline year: no growth is applied. Each later year
/// compounds rent and expenses by the configured growth rates. Vacancy
/// stays at the baseline rate and debt service is constant
/// (fixed-rate financing).
pub fn project_cash_flows(
    financials: &PropertyFinancials,
    growth: &GrowthAssumptions,
) -> RentRiskResult<ComputationOutput<CashFlowProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    financials.validate()?;
    validate_growth(growth)?;

    let monthly_payment = amortization::monthly_payment(
        financials.loan_principal(),
        financials.annual_interest_rate,
        financials.loan_term_years,
    )?;
    let debt_service = monthly_payment * dec!(12);

    let n = financials.holding_period_years;
    let mut years = Vec::with_capacity(n as usize);
    let mut gross_rent = financials.annual_gross_rent();
    let mut operating_expenses = financials.monthly_operating_expenses() * dec!(12);
    let mut cumulative_cash_flow = Decimal::ZERO;

    for year in 1..=n {
        if year > 1 {
            gross_rent *= Decimal::ONE + growth.rent_growth;
            operating_expenses *= Decimal::ONE + growth.expense_growth;
        }

        let effective_gross_income = gross_rent * (Decimal::ONE - financials.vacancy_rate);
        let noi = effective_gross_income - operating_expenses;
        let cash_flow = noi - debt_service;
        cumulative_cash_flow += cash_flow;

        years.push(YearCashFlow {
            year,
            gross_rent,
            effective_gross_income,
            operating_expenses,
            noi,
            debt_service,
            cash_flow,
        });
    }

    if cumulative_cash_flow < Decimal::ZERO {
        warnings.push(format!(
            "Cumulative cash flow over {n} years is negative under these growth assumptions"
        ));
    }

    let result = CashFlowProjection {
        years,
        cumulative_cash_flow,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Year Cash Flow Projection",
        &serde_json::json!({
            "holding_period_years": n,
            "rent_growth": growth.rent_growth,
            "expense_growth": growth.expense_growth,
            "vacancy_rate": financials.vacancy_rate,
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Scenario path (f64, used by the Monte Carlo engine)
// ---------------------------------------------------------------------------

/// f64 view of the financing baseline, computed once per simulation
/// run and shared by every scenario.
#[derive(Debug, Clone)]
pub struct ScenarioBasis {
    pub annual_gross_rent: f64,
    pub annual_operating_expenses: f64,
    pub annual_debt_service: f64,
}

impl ScenarioBasis {
    pub fn from_financials(financials: &PropertyFinancials) -> RentRiskResult<Self> {
        financials.validate()?;

        let monthly_payment = amortization::monthly_payment(
            financials.loan_principal(),
            financials.annual_interest_rate,
            financials.loan_term_years,
        )?;

        Ok(ScenarioBasis {
            annual_gross_rent: dec_to_f64(financials.annual_gross_rent()),
            annual_operating_expenses: dec_to_f64(
                financials.monthly_operating_expenses() * dec!(12),
            ),
            annual_debt_service: dec_to_f64(monthly_payment * dec!(12)),
        })
    }
}

fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}

/// Per-year rates for one scenario. All slices have holding-period
/// length; growth at index 0 is unused because year 1 is the baseline
/// year, while vacancy applies to every year including the first.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioPath<'a> {
    pub rent_growth: &'a [f64],
    pub expense_growth: &'a [f64],
    pub vacancy: &'a [f64],
}

/// Outcome of one projected scenario.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioOutcome {
    /// Cumulative cash flow over the holding period
    pub terminal_cash_flow: f64,
    /// Minimum single-year cash flow (stress indicator)
    pub worst_year_cash_flow: f64,
}

/// Project one scenario: same recurrence as `project_cash_flows`,
/// with per-year rates supplied by the caller. Each call is
/// independent; there is no shared cursor between scenarios.
pub fn project_scenario(basis: &ScenarioBasis, path: &ScenarioPath) -> ScenarioOutcome {
    debug_assert_eq!(path.rent_growth.len(), path.vacancy.len());
    debug_assert_eq!(path.expense_growth.len(), path.vacancy.len());

    let mut gross_rent = basis.annual_gross_rent;
    let mut operating_expenses = basis.annual_operating_expenses;
    let mut terminal_cash_flow = 0.0_f64;
    let mut worst_year_cash_flow = f64::INFINITY;

    for year in 0..path.vacancy.len() {
        if year > 0 {
            gross_rent *= 1.0 + path.rent_growth[year];
            operating_expenses *= 1.0 + path.expense_growth[year];
        }

        let cash_flow = gross_rent * (1.0 - path.vacancy[year])
            - operating_expenses
            - basis.annual_debt_service;
        terminal_cash_flow += cash_flow;
        worst_year_cash_flow = worst_year_cash_flow.min(cash_flow);
    }

    ScenarioOutcome {
        terminal_cash_flow,
        worst_year_cash_flow,
    }
}
