//! Monte Carlo risk simulation over multi-year cash-flow scenarios.
//!
//! `simulation` draws randomly perturbed growth/vacancy paths and
//! projects each one; `distribution` reduces the collected outcomes
//! into summary statistics and a risk profile.

pub mod distribution;
pub mod simulation;

pub use distribution::{RiskProfile, RiskRating, SummaryStatistics};
pub use simulation::{
    run_simulation, GrowthDistribution, RiskThresholds, SimulationConfig, SimulationOutput,
    VacancyDistribution,
};
