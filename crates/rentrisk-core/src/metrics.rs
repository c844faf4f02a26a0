use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization;
use crate::types::{with_metadata, ComputationOutput, Money, PropertyFinancials, Rate};
use crate::RentRiskResult;

/// Single-year investment metrics for one property.
///
/// Ratios that divide by an amount that can legitimately be zero
/// (debt service for an all-cash purchase, cash invested with no
/// down payment) are reported as `None` rather than forced to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResult {
    /// Fixed monthly mortgage payment (principal + interest)
    pub monthly_debt_service: Money,
    /// 12 x monthly payment
    pub annual_debt_service: Money,
    /// Annual gross rent after vacancy loss
    pub effective_gross_income: Money,
    /// Annual operating expenses (sum of the expense map, x 12)
    pub annual_operating_expenses: Money,
    /// Net operating income: EGI minus operating expenses, before debt service
    pub noi: Money,
    /// NOI minus annual debt service
    pub annual_cash_flow: Money,
    /// NOI / purchase price
    pub cap_rate: Rate,
    /// Annual cash flow / total cash invested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_on_cash_return: Option<Rate>,
    /// NOI / annual debt service; None for an all-cash purchase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<Rate>,
    /// Principal repaid during schedule year 1
    pub annual_principal_paydown: Money,
    /// (Annual cash flow + principal paydown) / total cash invested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<Rate>,
    /// Down payment plus one-time acquisition costs
    pub total_cash_invested: Money,
}

/// Compute the full deterministic metrics snapshot for one
/// representative year.
///
/// Pure: no I/O, no shared state; identical inputs give identical
/// outputs.
pub fn compute_metrics(
    financials: &PropertyFinancials,
) -> RentRiskResult<ComputationOutput<MetricsResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    financials.validate()?;

    let principal = financials.loan_principal();
    let monthly_debt_service = amortization::monthly_payment(
        principal,
        financials.annual_interest_rate,
        financials.loan_term_years,
    )?;
    let annual_debt_service = monthly_debt_service * dec!(12);

    let effective_gross_income =
        financials.annual_gross_rent() * (Decimal::ONE - financials.vacancy_rate);
    let annual_operating_expenses = financials.monthly_operating_expenses() * dec!(12);
    let noi = effective_gross_income - annual_operating_expenses;
    let annual_cash_flow = noi - annual_debt_service;

    let cap_rate = noi / financials.purchase_price;

    let total_cash_invested = financials.down_payment() + financials.one_time_costs;

    let cash_on_cash_return = if total_cash_invested.is_zero() {
        None
    } else {
        Some(annual_cash_flow / total_cash_invested)
    };

    let dscr = if annual_debt_service.is_zero() {
        None
    } else {
        Some(noi / annual_debt_service)
    };

    let annual_principal_paydown = if principal.is_zero() {
        Decimal::ZERO
    } else {
        amortization::annual_split(
            principal,
            financials.annual_interest_rate,
            financials.loan_term_years,
            1,
        )?
        .principal
    };

    let roi = if total_cash_invested.is_zero() {
        None
    } else {
        Some((annual_cash_flow + annual_principal_paydown) / total_cash_invested)
    };

    if annual_cash_flow < Decimal::ZERO {
        warnings.push(
            "Annual cash flow is negative: the property does not cover its debt service".into(),
        );
    }
    if let Some(d) = dscr {
        if d < dec!(1.2) {
            warnings.push(format!("DSCR of {d:.3} is below 1.20x, lender covenant risk"));
        }
    }
    if financials.vacancy_rate > dec!(0.15) {
        warnings.push(format!(
            "Vacancy rate {:.1}% exceeds 15%, above typical market norms",
            financials.vacancy_rate * dec!(100)
        ));
    }

    let result = MetricsResult {
        monthly_debt_service,
        annual_debt_service,
        effective_gross_income,
        annual_operating_expenses,
        noi,
        annual_cash_flow,
        cap_rate,
        cash_on_cash_return,
        dscr,
        annual_principal_paydown,
        roi,
        total_cash_invested,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rental Property Investment Metrics",
        financials,
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Reference deal: $450k price, 20% down, 6%/30y, $3,500 rent,
    /// $1,200 expenses, 8% vacancy. Deliberately thin cash flow.
    fn reference_deal() -> PropertyFinancials {
        PropertyFinancials {
            purchase_price: dec!(450000),
            down_payment_fraction: dec!(0.20),
            annual_interest_rate: dec!(0.06),
            loan_term_years: 30,
            monthly_gross_rent: dec!(3500),
            monthly_expenses: BTreeMap::from([
                ("property_tax".to_string(), dec!(550)),
                ("insurance".to_string(), dec!(150)),
                ("maintenance".to_string(), dec!(300)),
                ("property_management".to_string(), dec!(200)),
            ]),
            vacancy_rate: dec!(0.08),
            one_time_costs: Decimal::ZERO,
            holding_period_years: 10,
        }
    }

    #[test]
    fn test_reference_deal_formula_chain() {
        let out = compute_metrics(&reference_deal()).unwrap();
        let m = &out.result;

        // Payment on $360k at 6%/30y
        assert!((m.monthly_debt_service - dec!(2158.38)).abs() < dec!(0.01));

        // NOI = 3500*12*0.92 - 1200*12 = 38,640 - 14,400 = 24,240
        assert_eq!(m.noi, dec!(24240.00));

        // Annual cash flow ~ -1,660.58 (thin deal, flagged)
        assert!((m.annual_cash_flow - dec!(-1660.58)).abs() < dec!(0.10));
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("cash flow is negative")));

        // Cap rate = 24,240 / 450,000
        assert!((m.cap_rate - dec!(0.053867)).abs() < dec!(0.000001));

        // DSCR ~ 0.9359
        assert!((m.dscr.unwrap() - dec!(0.9359)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_cash_flow_identity() {
        let m = compute_metrics(&reference_deal()).unwrap().result;
        assert_eq!(m.annual_cash_flow, m.noi - m.annual_debt_service);
    }

    #[test]
    fn test_cap_rate_invariant_to_financing() {
        let base = reference_deal();
        let mut refinanced = reference_deal();
        refinanced.annual_interest_rate = dec!(0.09);

        let a = compute_metrics(&base).unwrap().result;
        let b = compute_metrics(&refinanced).unwrap().result;

        assert_eq!(a.cap_rate, b.cap_rate);
        assert!(b.dscr.unwrap() < a.dscr.unwrap());
    }

    #[test]
    fn test_all_cash_purchase_has_undefined_dscr() {
        let mut f = reference_deal();
        f.down_payment_fraction = Decimal::ONE;

        let m = compute_metrics(&f).unwrap().result;
        assert_eq!(m.monthly_debt_service, Decimal::ZERO);
        assert!(m.dscr.is_none());
        assert_eq!(m.annual_cash_flow, m.noi);
        assert_eq!(m.annual_principal_paydown, Decimal::ZERO);
    }

    #[test]
    fn test_one_time_costs_dilute_cash_on_cash() {
        let base = compute_metrics(&reference_deal()).unwrap().result;

        let mut with_costs = reference_deal();
        with_costs.one_time_costs = dec!(10000);
        let diluted = compute_metrics(&with_costs).unwrap().result;

        assert_eq!(diluted.total_cash_invested, dec!(100000));
        // Negative cash flow spread over more invested cash is a smaller loss rate
        assert!(diluted.cash_on_cash_return.unwrap() > base.cash_on_cash_return.unwrap());
    }

    #[test]
    fn test_roi_includes_principal_paydown() {
        let m = compute_metrics(&reference_deal()).unwrap().result;
        let expected =
            (m.annual_cash_flow + m.annual_principal_paydown) / m.total_cash_invested;
        assert_eq!(m.roi.unwrap(), expected);
        // Paydown pulls ROI above raw cash-on-cash for any financed deal
        assert!(m.roi.unwrap() > m.cash_on_cash_return.unwrap());
    }

    #[test]
    fn test_zero_down_payment_reports_undefined_ratios() {
        let mut f = reference_deal();
        f.down_payment_fraction = Decimal::ZERO;

        let m = compute_metrics(&f).unwrap().result;
        assert!(m.cash_on_cash_return.is_none());
        assert!(m.roi.is_none());
    }

    #[test]
    fn test_invalid_price_rejected() {
        let mut f = reference_deal();
        f.purchase_price = Decimal::ZERO;
        assert!(compute_metrics(&f).is_err());
    }

    #[test]
    fn test_dscr_warning_on_thin_coverage() {
        let out = compute_metrics(&reference_deal()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("DSCR")));
    }

    #[test]
    fn test_methodology_string() {
        let out = compute_metrics(&reference_deal()).unwrap();
        assert_eq!(out.methodology, "Rental Property Investment Metrics");
    }
}
