//! Glycemic metrics
//!
//! Reduces a glucose trace to the summary shown on the dashboard:
//! - Time in / below / above range (70-180 mg/dL)
//! - Average glucose and GMI (estimated A1C)
//! - Coefficient of variation
//!
//! The three range percentages are rounded independently, so they may sum to
//! 99 or 101.

use crate::clinical::types::{GlucosePoint, MetricsSummary, GLUCOSE_CEILING, GLUCOSE_FLOOR};
use crate::error::PortalError;
use serde::{Deserialize, Serialize};

/// Lower bound of the target range (mg/dL, inclusive)
pub const RANGE_LOW: i32 = 70;
/// Upper bound of the target range (mg/dL, inclusive)
pub const RANGE_HIGH: i32 = 180;

/// Metrics calculator for glucose traces
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Compute the summary for a trace. An empty trace yields all zeros.
    pub fn calculate(trace: &[GlucosePoint]) -> MetricsSummary {
        if trace.is_empty() {
            return MetricsSummary::default();
        }

        let total = trace.len() as f64;

        let in_range = trace
            .iter()
            .filter(|p| (RANGE_LOW..=RANGE_HIGH).contains(&p.glucose))
            .count();
        let below_range = trace.iter().filter(|p| p.glucose < RANGE_LOW).count();
        let above_range = trace.iter().filter(|p| p.glucose > RANGE_HIGH).count();

        let sum: f64 = trace.iter().map(|p| p.glucose as f64).sum();
        let average_glucose = (sum / total).round();

        MetricsSummary {
            time_in_range_pct: percentage(in_range, total),
            time_below_range_pct: percentage(below_range, total),
            time_above_range_pct: percentage(above_range, total),
            glucose_management_index: glucose_management_index(average_glucose),
            coefficient_of_variation_pct: coefficient_of_variation(trace, average_glucose),
            average_glucose: average_glucose as u32,
        }
    }

    /// Reject traces with readings outside the sensor range
    pub fn validate_trace(trace: &[GlucosePoint]) -> Result<(), PortalError> {
        match trace
            .iter()
            .position(|p| !(GLUCOSE_FLOOR..=GLUCOSE_CEILING).contains(&p.glucose))
        {
            Some(index) => Err(PortalError::InvalidField {
                field: "glucose".to_string(),
                reason: format!(
                    "reading {index} is {} mg/dL, outside {GLUCOSE_FLOOR}-{GLUCOSE_CEILING}",
                    trace[index].glucose
                ),
            }),
            None => Ok(()),
        }
    }

    /// Check a summary against the consensus CGM targets
    pub fn evaluate_targets(summary: &MetricsSummary) -> TargetReport {
        TargetReport {
            time_in_range_met: summary.time_in_range_pct > 70,
            time_below_range_met: summary.time_below_range_pct < 4,
            time_above_range_met: summary.time_above_range_pct < 25,
            variability_met: summary.coefficient_of_variation_pct < 36,
        }
    }
}

/// Which consensus targets a summary satisfies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// TIR > 70%
    pub time_in_range_met: bool,
    /// TBR < 4%
    pub time_below_range_met: bool,
    /// TAR < 25%
    pub time_above_range_met: bool,
    /// CV < 36%
    pub variability_met: bool,
}

impl TargetReport {
    pub fn all_met(&self) -> bool {
        self.time_in_range_met
            && self.time_below_range_met
            && self.time_above_range_met
            && self.variability_met
    }
}

/// GMI = (mean glucose + 46.7) / 28.7, one decimal place
pub fn glucose_management_index(average_glucose: f64) -> f64 {
    ((average_glucose + 46.7) / 28.7 * 10.0).round() / 10.0
}

/// Population CV around the already-rounded mean
fn coefficient_of_variation(trace: &[GlucosePoint], mean: f64) -> u32 {
    if mean <= 0.0 {
        return 0;
    }

    let variance = trace
        .iter()
        .map(|p| (p.glucose as f64 - mean).powi(2))
        .sum::<f64>()
        / trace.len() as f64;

    (variance.sqrt() / mean * 100.0).round() as u32
}

fn percentage(count: usize, total: f64) -> u32 {
    (count as f64 / total * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::timeseries::generate_glucose_trace;
    use crate::clinical::types::LookbackWindow;
    use chrono::{Duration, FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trace_of(values: &[i32]) -> Vec<GlucosePoint> {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &glucose)| GlucosePoint {
                timestamp: start + Duration::minutes(5 * i as i64),
                glucose,
            })
            .collect()
    }

    #[test]
    fn test_empty_trace() {
        assert_eq!(MetricsCalculator::calculate(&[]), MetricsSummary::default());
    }

    #[test]
    fn test_constant_trace_has_zero_cv() {
        let summary = MetricsCalculator::calculate(&trace_of(&[100, 100, 100, 100]));

        assert_eq!(summary.coefficient_of_variation_pct, 0);
        assert_eq!(summary.average_glucose, 100);
        assert_eq!(summary.time_in_range_pct, 100);
        assert_eq!(summary.time_below_range_pct, 0);
        assert_eq!(summary.time_above_range_pct, 0);
    }

    #[test]
    fn test_gmi_formula() {
        assert_eq!(glucose_management_index(126.0), 6.0);
        assert_eq!(glucose_management_index(154.0), 7.0);
    }

    #[test]
    fn test_validate_trace() {
        assert!(MetricsCalculator::validate_trace(&[]).is_ok());
        assert!(MetricsCalculator::validate_trace(&trace_of(&[55, 120, 350])).is_ok());

        match MetricsCalculator::validate_trace(&trace_of(&[100, -40, 120])) {
            Err(PortalError::InvalidField { field, reason }) => {
                assert_eq!(field, "glucose");
                assert_eq!(reason, "reading 1 is -40 mg/dL, outside 55-350");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
        assert!(MetricsCalculator::validate_trace(&trace_of(&[54])).is_err());
        assert!(MetricsCalculator::validate_trace(&trace_of(&[351])).is_err());
    }

    #[test]
    fn test_range_boundaries() {
        // 70 and 180 are in range, 69 below, 181 above
        let summary = MetricsCalculator::calculate(&trace_of(&[69, 70, 180, 181]));

        assert_eq!(summary.time_below_range_pct, 25);
        assert_eq!(summary.time_in_range_pct, 50);
        assert_eq!(summary.time_above_range_pct, 25);
    }

    #[test]
    fn test_independent_rounding_not_renormalized() {
        // thirds: 33 + 33 + 33 = 99
        let summary = MetricsCalculator::calculate(&trace_of(&[60, 100, 200]));

        assert_eq!(summary.time_below_range_pct, 33);
        assert_eq!(summary.time_in_range_pct, 33);
        assert_eq!(summary.time_above_range_pct, 33);
    }

    #[test]
    fn test_cv_uses_rounded_mean() {
        // mean 100.5 rounds to 101; deviations taken from 101
        let summary = MetricsCalculator::calculate(&trace_of(&[100, 101]));
        assert_eq!(summary.average_glucose, 101);

        let expected_sd = ((1.0_f64 + 0.0) / 2.0).sqrt();
        let expected_cv = (expected_sd / 101.0 * 100.0).round() as u32;
        assert_eq!(summary.coefficient_of_variation_pct, expected_cv);
    }

    #[test]
    fn test_known_summary() {
        let summary = MetricsCalculator::calculate(&trace_of(&[80, 120, 160, 200]));

        assert_eq!(
            summary,
            MetricsSummary {
                time_in_range_pct: 75,
                time_below_range_pct: 0,
                time_above_range_pct: 25,
                glucose_management_index: 6.5,
                coefficient_of_variation_pct: 32,
                average_glucose: 140,
            }
        );
    }

    #[test]
    fn test_generated_traces_percentages_sum_close_to_100() {
        let reference = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 1, 9, 0, 0)
            .unwrap();

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trace = generate_glucose_trace(&mut rng, reference, LookbackWindow::Week);
            let s = MetricsCalculator::calculate(&trace);

            let sum = s.time_in_range_pct + s.time_below_range_pct + s.time_above_range_pct;
            assert!((97..=103).contains(&sum), "sum {sum} out of slack");
            assert!(s.time_in_range_pct <= 100);
            assert!(s.time_below_range_pct <= 100);
            assert!(s.time_above_range_pct <= 100);
        }
    }

    #[test]
    fn test_evaluate_targets() {
        let good = MetricsSummary {
            time_in_range_pct: 80,
            time_below_range_pct: 2,
            time_above_range_pct: 18,
            glucose_management_index: 6.5,
            coefficient_of_variation_pct: 30,
            average_glucose: 140,
        };
        assert!(MetricsCalculator::evaluate_targets(&good).all_met());

        let poor = MetricsSummary {
            time_in_range_pct: 70,
            coefficient_of_variation_pct: 36,
            ..good
        };
        let report = MetricsCalculator::evaluate_targets(&poor);
        assert!(!report.time_in_range_met);
        assert!(!report.variability_met);
        assert!(report.time_below_range_met);
        assert!(!report.all_met());
    }
}
