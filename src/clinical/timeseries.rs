//! Synthetic CGM time series
//!
//! Generates a glucose trace as a biased random walk sampled every five minutes
//! and a handful of insulin deliveries inside the nightly active session
//! (22:00 - 10:00 local time).

use crate::clinical::types::{
    GlucosePoint, InsulinEvent, LookbackWindow, GLUCOSE_CEILING, GLUCOSE_FLOOR,
    SAMPLE_INTERVAL_MINUTES,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Local hour at which the nightly active session begins
pub const SESSION_START_HOUR: u32 = 22;
/// Local hour at which the nightly active session ends
pub const SESSION_END_HOUR: u32 = 10;

/// Fewest insulin events generated per session
pub const MIN_INSULIN_EVENTS: usize = 3;
/// Most insulin events generated per session
pub const MAX_INSULIN_EVENTS: usize = 6;

/// Half-width of the uniform per-step noise (mg/dL)
const STEP_NOISE: f64 = 4.0;

/// Insulin event anchored to the nearest glucose reading, for plotting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulinMarker {
    pub event: InsulinEvent,
    /// Glucose of the closest reading in time, if the trace is non-empty
    pub glucose: Option<i32>,
}

/// Generate a glucose trace covering `window` days before `reference`.
///
/// The trace starts at local midnight `window.days()` days before the
/// reference date and runs through the end of the reference date, one
/// reading every five minutes.
pub fn generate_glucose_trace<R: Rng + ?Sized>(
    rng: &mut R,
    reference: DateTime<FixedOffset>,
    window: LookbackWindow,
) -> Vec<GlucosePoint> {
    let offset = *reference.offset();
    let reference_date = reference.date_naive();
    let start = local_midnight(reference_date - Duration::days(window.days()), offset);
    let end = local_midnight(reference_date + Duration::days(1), offset);
    let step = Duration::minutes(SAMPLE_INTERVAL_MINUTES);

    let capacity = ((end - start).num_minutes() / SAMPLE_INTERVAL_MINUTES).max(0) as usize;
    let mut trace = Vec::with_capacity(capacity);

    let mut glucose: f64 = rng.gen_range(120.0..160.0);
    let mut current = start;

    while current < end {
        let change = drift_bias(current.hour()) + rng.gen_range(-STEP_NOISE..STEP_NOISE);
        glucose = (glucose + change).clamp(GLUCOSE_FLOOR as f64, GLUCOSE_CEILING as f64);

        trace.push(GlucosePoint {
            timestamp: current,
            glucose: glucose.round() as i32,
        });

        current += step;
    }

    trace
}

/// Generate the insulin deliveries for the session ending on the reference date.
///
/// Returns between three and six events, sorted ascending by timestamp.
pub fn generate_insulin_events<R: Rng + ?Sized>(
    rng: &mut R,
    reference: DateTime<FixedOffset>,
) -> Vec<InsulinEvent> {
    let (session_start, session_end) = session_bounds(reference.date_naive(), *reference.offset());
    let span_ms = (session_end - session_start).num_milliseconds();

    let count = rng.gen_range(MIN_INSULIN_EVENTS..=MAX_INSULIN_EVENTS);
    let mut events: Vec<InsulinEvent> = (0..count)
        .map(|_| InsulinEvent {
            timestamp: session_start + Duration::milliseconds(rng.gen_range(0..span_ms)),
            units: round_tenth(rng.gen_range(0.3..1.0)),
        })
        .collect();

    events.sort_by_key(|e| e.timestamp);
    events
}

/// Bounds of the active session that ends on `date`: previous day 22:00 to 10:00.
pub fn session_bounds(
    date: NaiveDate,
    offset: FixedOffset,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = local_midnight(date - Duration::days(1), offset)
        + Duration::hours(SESSION_START_HOUR as i64);
    let end = local_midnight(date, offset) + Duration::hours(SESSION_END_HOUR as i64);
    (start, end)
}

/// Whether a local hour falls inside the nightly active session
pub fn is_active_session_hour(hour: u32) -> bool {
    hour >= SESSION_START_HOUR || hour < SESSION_END_HOUR
}

/// Find the reading closest in time to `at`. Ties resolve to the earlier reading.
///
/// `trace` must be sorted ascending by timestamp, as produced by
/// [`generate_glucose_trace`].
pub fn nearest_point(trace: &[GlucosePoint], at: DateTime<FixedOffset>) -> Option<&GlucosePoint> {
    let idx = trace.partition_point(|p| p.timestamp < at);

    let before = idx.checked_sub(1).and_then(|i| trace.get(i));
    let after = trace.get(idx);

    match (before, after) {
        (Some(b), Some(a)) => {
            if (at - b.timestamp) <= (a.timestamp - at) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(b), None) => Some(b),
        (None, a) => a,
    }
}

/// Anchor each insulin event to the glucose reading nearest in time
pub fn anchor_insulin_events(trace: &[GlucosePoint], events: &[InsulinEvent]) -> Vec<InsulinMarker> {
    events
        .iter()
        .map(|event| InsulinMarker {
            event: *event,
            glucose: nearest_point(trace, event.timestamp).map(|p| p.glucose),
        })
        .collect()
}

/// Drift applied per step for a given local hour: meal spikes, overnight decline
fn drift_bias(hour: u32) -> f64 {
    match hour {
        7..=8 => 2.0,   // breakfast
        12..=13 => 1.5, // lunch
        18..=19 => 2.0, // dinner
        22..=23 | 0..=5 => -0.5,
        _ => -0.3,
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reference() -> DateTime<FixedOffset> {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        offset.with_ymd_and_hms(2026, 1, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_trace_bounds_and_cadence() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trace = generate_glucose_trace(&mut rng, reference(), LookbackWindow::Week);

            assert!(trace
                .iter()
                .all(|p| (GLUCOSE_FLOOR..=GLUCOSE_CEILING).contains(&p.glucose)));

            for pair in trace.windows(2) {
                assert_eq!(
                    pair[1].timestamp - pair[0].timestamp,
                    Duration::minutes(SAMPLE_INTERVAL_MINUTES)
                );
            }
        }
    }

    #[test]
    fn test_trace_spans_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let trace = generate_glucose_trace(&mut rng, reference(), LookbackWindow::Day);

        // previous day plus the reference day, 288 readings each
        assert_eq!(trace.len(), 576);

        let first = trace.first().unwrap();
        assert_eq!(first.timestamp.date_naive(), reference().date_naive() - Duration::days(1));
        assert_eq!(first.timestamp.hour(), 0);
        assert_eq!(first.timestamp.minute(), 0);

        let last = trace.last().unwrap();
        assert_eq!(last.timestamp.date_naive(), reference().date_naive());
        assert_eq!((last.timestamp.hour(), last.timestamp.minute()), (23, 55));
    }

    #[test]
    fn test_fortnight_length() {
        let mut rng = StdRng::seed_from_u64(3);
        let trace = generate_glucose_trace(&mut rng, reference(), LookbackWindow::Fortnight);
        assert_eq!(trace.len(), 15 * 288);
    }

    #[test]
    fn test_same_seed_same_trace() {
        let a = generate_glucose_trace(&mut StdRng::seed_from_u64(11), reference(), LookbackWindow::Day);
        let b = generate_glucose_trace(&mut StdRng::seed_from_u64(11), reference(), LookbackWindow::Day);
        assert_eq!(a, b);
    }

    #[test]
    fn test_insulin_events_sorted_and_bounded() {
        let (start, end) = session_bounds(reference().date_naive(), *reference().offset());

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let events = generate_insulin_events(&mut rng, reference());

            assert!((MIN_INSULIN_EVENTS..=MAX_INSULIN_EVENTS).contains(&events.len()));
            assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

            for event in &events {
                assert!(event.timestamp >= start && event.timestamp < end);
                assert!((0.3..=1.0).contains(&event.units));
                assert!(is_active_session_hour(event.timestamp.hour()));
            }
        }
    }

    #[test]
    fn test_session_bounds() {
        let (start, end) = session_bounds(reference().date_naive(), *reference().offset());
        assert_eq!(start.hour(), 22);
        assert_eq!(end.hour(), 10);
        assert_eq!(end - start, Duration::hours(12));
    }

    #[test]
    fn test_active_session_hours() {
        assert!(is_active_session_hour(22));
        assert!(is_active_session_hour(0));
        assert!(is_active_session_hour(9));
        assert!(!is_active_session_hour(10));
        assert!(!is_active_session_hour(21));
    }

    #[test]
    fn test_drift_bias() {
        assert_eq!(drift_bias(7), 2.0);
        assert_eq!(drift_bias(13), 1.5);
        assert_eq!(drift_bias(19), 2.0);
        assert_eq!(drift_bias(23), -0.5);
        assert_eq!(drift_bias(3), -0.5);
        assert_eq!(drift_bias(10), -0.3);
        assert_eq!(drift_bias(6), -0.3);
    }

    #[test]
    fn test_nearest_point() {
        let base = reference();
        let trace: Vec<GlucosePoint> = (0..4)
            .map(|i| GlucosePoint {
                timestamp: base + Duration::minutes(5 * i),
                glucose: 100 + i as i32,
            })
            .collect();

        assert_eq!(nearest_point(&trace, base - Duration::hours(1)).unwrap().glucose, 100);
        assert_eq!(nearest_point(&trace, base + Duration::minutes(6)).unwrap().glucose, 101);
        assert_eq!(nearest_point(&trace, base + Duration::minutes(9)).unwrap().glucose, 102);
        // exactly between two readings resolves to the earlier one
        assert_eq!(
            nearest_point(&trace, base + Duration::seconds(450)).unwrap().glucose,
            101
        );
        assert_eq!(nearest_point(&trace, base + Duration::days(1)).unwrap().glucose, 103);
        assert!(nearest_point(&[], base).is_none());
    }

    #[test]
    fn test_anchor_insulin_events() {
        let mut rng = StdRng::seed_from_u64(5);
        let trace = generate_glucose_trace(&mut rng, reference(), LookbackWindow::Day);
        let events = generate_insulin_events(&mut rng, reference());

        let markers = anchor_insulin_events(&trace, &events);
        assert_eq!(markers.len(), events.len());
        assert!(markers.iter().all(|m| m.glucose.is_some()));

        let empty = anchor_insulin_events(&[], &events);
        assert!(empty.iter().all(|m| m.glucose.is_none()));
    }
}
