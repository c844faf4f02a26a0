use serde::{Deserialize, Serialize};

use crate::error::RentRiskError;
use crate::monte_carlo::simulation::RiskThresholds;
use crate::RentRiskResult;

/// Order-insensitive summary of a sample collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    pub percentile_5: f64,
    pub median: f64,
    pub percentile_95: f64,
}

/// Qualitative risk band assigned from the probability-of-loss
/// thresholds in the simulation config.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskRating {
    Low,
    Moderate,
    High,
}

/// Risk profile of the terminal cash-flow distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub summary: SummaryStatistics,
    /// Loss magnitude not exceeded with 95% confidence: max(0, -P5)
    pub value_at_risk_95: f64,
    /// Loss magnitude not exceeded with 99% confidence: max(0, -P1)
    pub value_at_risk_99: f64,
    /// Fraction of iterations with negative terminal cash flow
    pub probability_of_loss: f64,
    pub risk_rating: RiskRating,
}

/// Compute the percentile value from a **sorted** slice using linear
/// interpolation between order statistics.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Summarize a sample collection. Sorts the slice in place.
pub(crate) fn summarize(values: &mut [f64]) -> RentRiskResult<SummaryStatistics> {
    if values.is_empty() {
        return Err(RentRiskError::InvalidSimulationConfig {
            field: "samples".into(),
            reason: "Cannot summarize an empty sample collection".into(),
        });
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len() as f64;

    let mean = values.iter().sum::<f64>() / n;

    let std_dev = if values.len() < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    Ok(SummaryStatistics {
        mean,
        std_dev,
        percentile_5: percentile_sorted(values, 5.0),
        median: percentile_sorted(values, 50.0),
        percentile_95: percentile_sorted(values, 95.0),
    })
}

/// Reduce terminal cash-flow samples into a risk profile.
///
/// Deterministic: identical sample collections always produce
/// identical output, and every statistic is insensitive to the
/// original iteration order. Sorts the slice in place.
pub(crate) fn aggregate(
    terminal: &mut [f64],
    thresholds: &RiskThresholds,
) -> RentRiskResult<RiskProfile> {
    let summary = summarize(terminal)?;
    let n = terminal.len() as f64;

    let percentile_1 = percentile_sorted(terminal, 1.0);
    let value_at_risk_95 = (-summary.percentile_5).max(0.0);
    let value_at_risk_99 = (-percentile_1).max(0.0);

    let losses = terminal.iter().filter(|&&v| v < 0.0).count();
    let probability_of_loss = losses as f64 / n;

    let risk_rating = if probability_of_loss < thresholds.low_max_loss_probability {
        RiskRating::Low
    } else if probability_of_loss <= thresholds.moderate_max_loss_probability {
        RiskRating::Moderate
    } else {
        RiskRating::High
    };

    Ok(RiskProfile {
        summary,
        value_at_risk_95,
        value_at_risk_99,
        probability_of_loss,
        risk_rating,
    })
}
