use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;

use crate::error::RentRiskError;
use crate::monte_carlo::distribution::{self, RiskProfile, SummaryStatistics};
use crate::projection::{project_scenario, ScenarioBasis, ScenarioPath};
use crate::types::{ComputationMetadata, ComputationOutput, PropertyFinancials};
use crate::RentRiskResult;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
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
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Normal distribution parameters for an annual growth variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowthDistribution {
    pub mean: f64,
    pub std_dev: f64,
}

/// Normal distribution parameters for the vacancy rate. Draws are
/// clamped into [0, 1]; tail behavior is expected, not caller error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VacancyDistribution {
    pub mean: f64,
    pub std_dev: f64,
}

/// Probability-of-loss thresholds for the qualitative risk rating.
/// A configuration surface, not business logic baked into the
/// aggregator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Ratings below this probability of loss are LOW
    pub low_max_loss_probability: f64,
    /// Ratings at or below this probability of loss are MODERATE; above is HIGH
    pub moderate_max_loss_probability: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            low_max_loss_probability: 0.05,
            moderate_max_loss_probability: 0.20,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent scenario runs
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Seed for bit-reproducible runs; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Annual rent growth distribution
    pub rent_growth: GrowthDistribution,
    /// Annual expense growth distribution
    pub expense_growth: GrowthDistribution,
    /// Annual vacancy rate distribution
    pub vacancy: VacancyDistribution,
    /// Retain the raw terminal cash-flow samples in the output
    #[serde(default)]
    pub collect_samples: bool,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
}

fn default_iterations() -> u32 {
    10_000
}

/// Floor for sampled growth rates. A year can wipe out the entire
/// rent roll (or zero out expenses) but a figure never goes negative.
const MIN_ANNUAL_GROWTH: f64 = -1.0;

/// Output of a full simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub iterations: u32,
    /// Risk profile of the terminal (cumulative) cash flow
    pub terminal_cash_flow: RiskProfile,
    /// Summary of each iteration's worst single-year cash flow
    pub worst_year_cash_flow: SummaryStatistics,
    /// Raw terminal samples, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Per-variable sampler. A zero standard deviation degenerates to a
/// constant and consumes no draws from the generator.
enum Sampler {
    Constant(f64),
    Gaussian(Normal),
}

impl Sampler {
    fn new(mean: f64, std_dev: f64, field: &str) -> RentRiskResult<Self> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(RentRiskError::InvalidSimulationConfig {
                field: field.into(),
                reason: "Standard deviation must be non-negative and finite".into(),
            });
        }
        if !mean.is_finite() {
            return Err(RentRiskError::InvalidSimulationConfig {
                field: field.into(),
                reason: "Mean must be finite".into(),
            });
        }
        if std_dev == 0.0 {
            return Ok(Sampler::Constant(mean));
        }
        let normal =
            Normal::new(mean, std_dev).map_err(|e| RentRiskError::InvalidSimulationConfig {
                field: field.into(),
                reason: format!("Invalid Normal parameters: {e}"),
            })?;
        Ok(Sampler::Gaussian(normal))
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        match self {
            Sampler::Constant(v) => *v,
            Sampler::Gaussian(n) => rng.sample(*n),
        }
    }
}

fn validate_config(config: &SimulationConfig) -> RentRiskResult<()> {
    if config.iterations < 1 {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "iterations".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if !(0.0..=1.0).contains(&config.vacancy.mean) {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "vacancy.mean".into(),
            reason: "Vacancy mean must be between 0 and 1".into(),
        });
    }
    let t = &config.risk_thresholds;
    if !(0.0..=1.0).contains(&t.low_max_loss_probability)
        || !(0.0..=1.0).contains(&t.moderate_max_loss_probability)
        || t.low_max_loss_probability > t.moderate_max_loss_probability
    {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "risk_thresholds".into(),
            reason: "Thresholds must satisfy 0 <= low <= moderate <= 1".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a Monte Carlo risk simulation over the property's holding
/// period.
///
/// Each iteration draws one rent-growth, expense-growth and
/// vacancy-rate sample per year (in that fixed order), projects the
/// scenario, and records the terminal cumulative cash flow plus the
/// worst single-year cash flow. Iterations share no state beyond the
/// sequential random stream; with a seed, re-running with identical
/// inputs reproduces the output bit for bit.
pub fn run_simulation(
    financials: &PropertyFinancials,
    config: &SimulationConfig,
) -> RentRiskResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let basis = ScenarioBasis::from_financials(financials)?;
    validate_config(config)?;

    let rent_sampler = Sampler::new(
        config.rent_growth.mean,
        config.rent_growth.std_dev,
        "rent_growth",
    )?;
    let expense_sampler = Sampler::new(
        config.expense_growth.mean,
        config.expense_growth.std_dev,
        "expense_growth",
    )?;
    let vacancy_sampler =
        Sampler::new(config.vacancy.mean, config.vacancy.std_dev, "vacancy")?;

    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let iterations = config.iterations as usize;
    let years = financials.holding_period_years as usize;

    let mut terminal = Vec::with_capacity(iterations);
    let mut worst_year = Vec::with_capacity(iterations);

    let mut rent_growth = vec![0.0_f64; years];
    let mut expense_growth = vec![0.0_f64; years];
    let mut vacancy = vec![0.0_f64; years];

    for _ in 0..iterations {
        for year in 0..years {
            // Tail draws outside the variable's domain are clamped,
            // not resampled. Growth is floored at -100% so a rent or
            // expense figure can shrink to zero but never flip sign.
            rent_growth[year] = rent_sampler.draw(&mut rng).max(MIN_ANNUAL_GROWTH);
            expense_growth[year] = expense_sampler.draw(&mut rng).max(MIN_ANNUAL_GROWTH);
            vacancy[year] = vacancy_sampler.draw(&mut rng).clamp(0.0, 1.0);
        }

        let outcome = project_scenario(
            &basis,
            &ScenarioPath {
                rent_growth: &rent_growth,
                expense_growth: &expense_growth,
                vacancy: &vacancy,
            },
        );
        terminal.push(outcome.terminal_cash_flow);
        worst_year.push(outcome.worst_year_cash_flow);
    }

    let samples = config.collect_samples.then(|| terminal.clone());

    let terminal_profile = distribution::aggregate(&mut terminal, &config.risk_thresholds)?;
    let worst_year_summary = distribution::summarize(&mut worst_year)?;

    if terminal_profile.probability_of_loss > config.risk_thresholds.moderate_max_loss_probability
    {
        warnings.push(format!(
            "{:.1}% of scenarios end with a cumulative loss",
            terminal_profile.probability_of_loss * 100.0
        ));
    }

    let output = SimulationOutput {
        iterations: config.iterations,
        terminal_cash_flow: terminal_profile,
        worst_year_cash_flow: worst_year_summary,
        samples,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Cash Flow Risk Simulation",
        &serde_json::json!({
            "iterations": config.iterations,
            "seed": config.seed,
            "holding_period_years": financials.holding_period_years,
            "rent_growth": config.rent_growth,
            "expense_growth": config.expense_growth,
            "vacancy": config.vacancy,
            "risk_thresholds": config.risk_thresholds,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::distribution::RiskRating;
    use crate::projection::GrowthAssumptions;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    const SEED: u64 = 42;

    fn sample_financials() -> PropertyFinancials {
        PropertyFinancials {
            purchase_price: dec!(300000),
            down_payment_fraction: dec!(0.25),
            annual_interest_rate: dec!(0.05),
            loan_term_years: 30,
            monthly_gross_rent: dec!(2600),
            monthly_expenses: BTreeMap::from([
                ("property_tax".to_string(), dec!(350)),
                ("insurance".to_string(), dec!(120)),
                ("maintenance".to_string(), dec!(230)),
            ]),
            vacancy_rate: dec!(0.05),
            one_time_costs: rust_decimal::Decimal::ZERO,
            holding_period_years: 10,
        }
    }

    fn basic_config() -> SimulationConfig {
        SimulationConfig {
            iterations: 5_000,
            seed: Some(SEED),
            rent_growth: GrowthDistribution {
                mean: 0.03,
                std_dev: 0.01,
            },
            expense_growth: GrowthDistribution {
                mean: 0.02,
                std_dev: 0.01,
            },
            vacancy: VacancyDistribution {
                mean: 0.05,
                std_dev: 0.02,
            },
            collect_samples: false,
            risk_thresholds: RiskThresholds::default(),
        }
    }

    #[test]
    fn test_simulation_runs() {
        let out = run_simulation(&sample_financials(), &basic_config()).unwrap();
        assert_eq!(out.result.iterations, 5_000);
        assert!(out.result.terminal_cash_flow.summary.std_dev > 0.0);
    }

    #[test]
    fn test_seeded_runs_are_bit_identical() {
        let f = sample_financials();
        let mut config = basic_config();
        config.collect_samples = true;

        let r1 = run_simulation(&f, &config).unwrap();
        let r2 = run_simulation(&f, &config).unwrap();
        assert_eq!(r1.result, r2.result);
    }

    #[test]
    fn test_different_seeds_differ() {
        let f = sample_financials();
        let a = run_simulation(&f, &basic_config()).unwrap();
        let mut config = basic_config();
        config.seed = Some(SEED + 1);
        let b = run_simulation(&f, &config).unwrap();
        assert_ne!(
            a.result.terminal_cash_flow.summary.mean,
            b.result.terminal_cash_flow.summary.mean
        );
    }

    #[test]
    fn test_zero_std_dev_degenerates_to_deterministic_projection() {
        let f = sample_financials();
        let config = SimulationConfig {
            iterations: 10_000,
            seed: Some(SEED),
            rent_growth: GrowthDistribution {
                mean: 0.03,
                std_dev: 0.0,
            },
            expense_growth: GrowthDistribution {
                mean: 0.02,
                std_dev: 0.0,
            },
            vacancy: VacancyDistribution {
                mean: 0.05,
                std_dev: 0.0,
            },
            collect_samples: false,
            risk_thresholds: RiskThresholds::default(),
        };
        let out = run_simulation(&f, &config).unwrap();
        let profile = &out.result.terminal_cash_flow;

        // Every iteration sees the same path
        assert!(profile.summary.std_dev < 1e-6);
        assert_eq!(profile.summary.median, profile.summary.percentile_95);
        assert!(
            profile.probability_of_loss == 0.0 || profile.probability_of_loss == 1.0,
            "degenerate run must be all-loss or no-loss, got {}",
            profile.probability_of_loss
        );

        let deterministic = crate::projection::project_cash_flows(
            &f,
            &GrowthAssumptions {
                rent_growth: dec!(0.03),
                expense_growth: dec!(0.02),
            },
        )
        .unwrap()
        .result
        .cumulative_cash_flow
        .to_f64()
        .unwrap();
        assert!(
            (profile.summary.mean - deterministic).abs() < 0.01,
            "simulated {} vs deterministic {}",
            profile.summary.mean,
            deterministic
        );
    }

    #[test]
    fn test_probability_of_loss_monotone_in_expense_growth() {
        let f = sample_financials();
        let mut previous = -1.0_f64;
        for mean in [0.00, 0.03, 0.06, 0.09, 0.12] {
            let mut config = basic_config();
            config.iterations = 2_000;
            config.expense_growth.mean = mean;
            let out = run_simulation(&f, &config).unwrap();
            let p = out.result.terminal_cash_flow.probability_of_loss;
            assert!(
                p >= previous,
                "loss probability fell from {previous} to {p} at expense growth {mean}"
            );
            previous = p;
        }
    }

    #[test]
    fn test_var_99_at_least_var_95() {
        let f = sample_financials();
        let mut config = basic_config();
        // Push the distribution into loss territory
        config.expense_growth.mean = 0.10;
        config.expense_growth.std_dev = 0.05;
        let out = run_simulation(&f, &config).unwrap();
        let profile = &out.result.terminal_cash_flow;
        assert!(profile.value_at_risk_99 >= profile.value_at_risk_95);
        assert!(profile.value_at_risk_95 > 0.0);
    }

    #[test]
    fn test_worst_year_never_exceeds_terminal_mean_per_year() {
        let out = run_simulation(&sample_financials(), &basic_config()).unwrap();
        let r = &out.result;
        // The worst year of a scenario is at most its per-year average
        assert!(
            r.worst_year_cash_flow.mean <= r.terminal_cash_flow.summary.mean / 10.0 + 1e-6
        );
    }

    #[test]
    fn test_samples_only_when_requested() {
        let f = sample_financials();
        let without = run_simulation(&f, &basic_config()).unwrap();
        assert!(without.result.samples.is_none());

        let mut config = basic_config();
        config.collect_samples = true;
        let with = run_simulation(&f, &config).unwrap();
        assert_eq!(with.result.samples.unwrap().len(), 5_000);
    }

    #[test]
    fn test_single_iteration_accepted() {
        let mut config = basic_config();
        config.iterations = 1;
        let out = run_simulation(&sample_financials(), &config).unwrap();
        assert_eq!(out.result.iterations, 1);
        assert_eq!(out.result.terminal_cash_flow.summary.std_dev, 0.0);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = basic_config();
        config.iterations = 0;
        assert!(matches!(
            run_simulation(&sample_financials(), &config).unwrap_err(),
            RentRiskError::InvalidSimulationConfig { .. }
        ));
    }

    #[test]
    fn test_negative_std_dev_rejected() {
        let mut config = basic_config();
        config.rent_growth.std_dev = -0.01;
        assert!(run_simulation(&sample_financials(), &config).is_err());
    }

    #[test]
    fn test_vacancy_mean_out_of_range_rejected() {
        let mut config = basic_config();
        config.vacancy.mean = 1.5;
        assert!(run_simulation(&sample_financials(), &config).is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = basic_config();
        config.risk_thresholds = RiskThresholds {
            low_max_loss_probability: 0.30,
            moderate_max_loss_probability: 0.10,
        };
        assert!(run_simulation(&sample_financials(), &config).is_err());
    }

    #[test]
    fn test_invalid_financials_rejected_before_sampling() {
        let mut f = sample_financials();
        f.purchase_price = dec!(-1);
        assert!(matches!(
            run_simulation(&f, &basic_config()).unwrap_err(),
            RentRiskError::InvalidPropertyFinancials { .. }
        ));
    }

    #[test]
    fn test_heavy_vacancy_tail_is_clamped_not_rejected() {
        let mut config = basic_config();
        config.vacancy = VacancyDistribution {
            mean: 0.5,
            std_dev: 5.0,
        };
        let out = run_simulation(&sample_financials(), &config).unwrap();
        // With vacancy pinned to [0,1] the loss cannot exceed full
        // rent plus expenses and debt service for every year
        let basis_loss_floor = -(sample_financials()
            .monthly_operating_expenses()
            .to_f64()
            .unwrap()
            * 12.0
            + 25_000.0)
            * 10.0;
        assert!(out.result.terminal_cash_flow.summary.percentile_5 > basis_loss_floor);
    }

    #[test]
    fn test_extreme_growth_tails_are_floored_at_full_wipeout() {
        // Expense volatility wide enough that raw normal draws fall
        // below -100%. Floored draws keep expenses non-negative, so
        // no scenario can ever beat the zero-expense ceiling.
        let f = sample_financials();
        let mut config = basic_config();
        config.collect_samples = true;
        config.rent_growth = GrowthDistribution {
            mean: 0.0,
            std_dev: 0.0,
        };
        config.vacancy = VacancyDistribution {
            mean: 0.0,
            std_dev: 0.0,
        };
        config.expense_growth = GrowthDistribution {
            mean: 0.0,
            std_dev: 2.0,
        };

        let out = run_simulation(&f, &config).unwrap();

        let basis = ScenarioBasis::from_financials(&f).unwrap();
        let ceiling = (basis.annual_gross_rent - basis.annual_debt_service) * 10.0;
        for sample in out.result.samples.unwrap() {
            assert!(
                sample <= ceiling + 1e-6,
                "sample {sample} exceeds the zero-expense ceiling {ceiling}"
            );
        }
    }

    #[test]
    fn test_risk_rating_reflects_loss_probability() {
        let f = sample_financials();

        // Strongly profitable configuration
        let mut safe = basic_config();
        safe.rent_growth.mean = 0.08;
        safe.expense_growth.mean = 0.0;
        safe.vacancy = VacancyDistribution {
            mean: 0.02,
            std_dev: 0.005,
        };
        let out = run_simulation(&f, &safe).unwrap();
        assert_eq!(out.result.terminal_cash_flow.risk_rating, RiskRating::Low);

        // Expenses outrunning rent every year
        let mut risky = basic_config();
        risky.rent_growth.mean = -0.02;
        risky.expense_growth.mean = 0.15;
        let out = run_simulation(&f, &risky).unwrap();
        assert_eq!(out.result.terminal_cash_flow.risk_rating, RiskRating::High);
        assert!(!out.warnings.is_empty());
    }
}
