use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

use rentrisk_core::metrics;
use rentrisk_core::monte_carlo::{
    self, GrowthDistribution, RiskThresholds, SimulationConfig, VacancyDistribution,
};
use rentrisk_core::projection::{self, GrowthAssumptions};
use rentrisk_core::PropertyFinancials;

use crate::input;

/// Property flags shared by every analysis command. A JSON/YAML file
/// (or piped JSON) replaces these entirely; the flag form collapses
/// the expense breakdown into a single "operating" category.
#[derive(Args)]
pub struct PropertyFlags {
    /// Path to a JSON or YAML property file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price
    #[arg(long)]
    pub purchase_price: Option<Decimal>,

    /// Down payment as a fraction of price (e.g. 0.20 for 20%)
    #[arg(long, alias = "down")]
    pub down_payment_fraction: Option<Decimal>,

    /// Annual mortgage interest rate (e.g. 0.06 for 6%)
    #[arg(long, alias = "rate")]
    pub interest_rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value = "30")]
    pub loan_term_years: u32,

    /// Monthly gross rent at full occupancy
    #[arg(long, alias = "rent")]
    pub monthly_rent: Option<Decimal>,

    /// Total monthly operating expenses
    #[arg(long, alias = "expenses")]
    pub monthly_expenses: Option<Decimal>,

    /// Expected vacancy rate (e.g. 0.08 for 8%)
    #[arg(long, default_value = "0")]
    pub vacancy_rate: Decimal,

    /// One-time acquisition costs (closing, initial repairs)
    #[arg(long, default_value = "0")]
    pub one_time_costs: Decimal,

    /// Holding period in years
    #[arg(long, default_value = "10")]
    pub holding_period_years: u32,
}

impl PropertyFlags {
    fn load(&self) -> Result<PropertyFinancials, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            return input::read_file(path);
        }
        if let Some(data) = input::read_stdin()? {
            return Ok(serde_json::from_value(data)?);
        }

        let monthly_expenses = match self.monthly_expenses {
            Some(total) if !total.is_zero() => {
                BTreeMap::from([("operating".to_string(), total)])
            }
            _ => BTreeMap::new(),
        };

        Ok(PropertyFinancials {
            purchase_price: self
                .purchase_price
                .ok_or("--purchase-price is required (or provide --input)")?,
            down_payment_fraction: self
                .down_payment_fraction
                .ok_or("--down-payment-fraction is required (or provide --input)")?,
            annual_interest_rate: self
                .interest_rate
                .ok_or("--interest-rate is required (or provide --input)")?,
            loan_term_years: self.loan_term_years,
            monthly_gross_rent: self
                .monthly_rent
                .ok_or("--monthly-rent is required (or provide --input)")?,
            monthly_expenses,
            vacancy_rate: self.vacancy_rate,
            one_time_costs: self.one_time_costs,
            holding_period_years: self.holding_period_years,
        })
    }
}

/// Arguments for the metrics command
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub property: PropertyFlags,
}

/// Arguments for the projection command
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub property: PropertyFlags,

    /// Annual rent growth rate
    #[arg(long, default_value = "0.03")]
    pub rent_growth: Decimal,

    /// Annual expense growth rate
    #[arg(long, default_value = "0.02")]
    pub expense_growth: Decimal,
}

/// Arguments for the simulation command
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub property: PropertyFlags,

    /// Path to a JSON or YAML simulation config (overrides simulation flags)
    #[arg(long)]
    pub config: Option<String>,

    /// Number of simulation iterations
    #[arg(long, default_value = "10000")]
    pub iterations: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Mean annual rent growth
    #[arg(long, default_value = "0.03")]
    pub rent_growth_mean: f64,

    /// Std dev of annual rent growth
    #[arg(long, default_value = "0.01")]
    pub rent_growth_std_dev: f64,

    /// Mean annual expense growth
    #[arg(long, default_value = "0.02")]
    pub expense_growth_mean: f64,

    /// Std dev of annual expense growth
    #[arg(long, default_value = "0.01")]
    pub expense_growth_std_dev: f64,

    /// Mean vacancy rate
    #[arg(long, default_value = "0.05")]
    pub vacancy_mean: f64,

    /// Std dev of the vacancy rate
    #[arg(long, default_value = "0.02")]
    pub vacancy_std_dev: f64,

    /// Include the raw terminal cash flow samples in the output
    #[arg(long)]
    pub collect_samples: bool,
}

impl SimulateArgs {
    fn simulation_config(&self) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.config {
            return input::read_file(path);
        }
        Ok(SimulationConfig {
            iterations: self.iterations,
            seed: self.seed,
            rent_growth: GrowthDistribution {
                mean: self.rent_growth_mean,
                std_dev: self.rent_growth_std_dev,
            },
            expense_growth: GrowthDistribution {
                mean: self.expense_growth_mean,
                std_dev: self.expense_growth_std_dev,
            },
            vacancy: VacancyDistribution {
                mean: self.vacancy_mean,
                std_dev: self.vacancy_std_dev,
            },
            collect_samples: self.collect_samples,
            risk_thresholds: RiskThresholds::default(),
        })
    }
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let financials = args.property.load()?;
    let output = metrics::compute_metrics(&financials)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let financials = args.property.load()?;
    let growth = GrowthAssumptions {
        rent_growth: args.rent_growth,
        expense_growth: args.expense_growth,
    };
    let output = projection::project_cash_flows(&financials, &growth)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let financials = args.property.load()?;
    let config = args.simulation_config()?;
    let output = monte_carlo::run_simulation(&financials, &config)?;
    Ok(serde_json::to_value(output)?)
}
