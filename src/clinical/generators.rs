//! Auxiliary record generators
//!
//! Session history, sleep-tracker nights and the participant roster. Each
//! generator is independent of the glucose trace; no cross-record consistency
//! is attempted.

use crate::clinical::timeseries::session_bounds;
use crate::clinical::types::{
    HourlySleepSample, ParticipantRecord, ParticipantStatus, SessionRecord, SessionStatus,
    SleepRecord, SleepStages, StudySummary, Trend,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rand::Rng;

/// Default number of sessions shown in a participant's history
pub const DEFAULT_SESSION_COUNT: usize = 14;
/// Default roster size
pub const DEFAULT_PARTICIPANT_COUNT: usize = 12;

/// Probability that a session records a hypoglycemic event
const HYPO_PROBABILITY: f64 = 0.15;

/// Roster status draw: five Active for every Paused and Flagged
const PARTICIPANT_STATUSES: [ParticipantStatus; 7] = [
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Paused,
    ParticipantStatus::Flagged,
];

/// Generate `count` sessions, newest first. Session `i` ends on the morning of
/// `reference - i days`.
pub fn generate_session_history<R: Rng + ?Sized>(
    rng: &mut R,
    reference: DateTime<FixedOffset>,
    count: usize,
) -> Vec<SessionRecord> {
    let offset = *reference.offset();
    let reference_date = reference.date_naive();

    (0..count)
        .map(|i| {
            let date = reference_date - Duration::days(i as i64);
            let (start_at, end_at) = session_bounds(date, offset);

            SessionRecord {
                id: format!("session-{i}"),
                date,
                start_time: "10:00 PM".to_string(),
                end_time: "10:00 AM".to_string(),
                start_at,
                end_at,
                total_insulin_units: round_tenth(rng.gen_range(8.0..16.0)),
                session_time_in_range_pct: rng.gen_range(65..90),
                hypoglycemic_event_count: u32::from(rng.gen_bool(HYPO_PROBABILITY)),
                status: draw_session_status(rng),
            }
        })
        .collect()
}

/// Generate one night of sleep data for `date`
pub fn generate_sleep_record<R: Rng + ?Sized>(rng: &mut R, date: NaiveDate) -> SleepRecord {
    let deep_pct = rng.gen_range(20..35);
    let rem_pct = rng.gen_range(15..30);
    let light_pct = 100 - deep_pct - rem_pct;

    let duration_minutes: u32 = rng.gen_range(390..510);
    let stages = SleepStages {
        deep_pct,
        rem_pct,
        light_pct,
    };

    SleepRecord {
        date,
        duration_minutes,
        duration_label: format!("{}h {}m", duration_minutes / 60, duration_minutes % 60),
        efficiency_pct: rng.gen_range(85..97),
        heart_rate_variability_ms: rng.gen_range(40..70),
        resting_heart_rate: rng.gen_range(55..70),
        readiness_score: rng.gen_range(75..95),
        stages,
        hourly_samples: generate_hourly_samples(rng, duration_minutes, &stages),
    }
}

/// Per-hour stage samples: each stage jittered by [-10, 10) and clamped to [0, 60].
fn generate_hourly_samples<R: Rng + ?Sized>(
    rng: &mut R,
    duration_minutes: u32,
    stages: &SleepStages,
) -> Vec<HourlySleepSample> {
    let hours = duration_minutes.div_ceil(60);

    (0..hours)
        .map(|hour| HourlySleepSample {
            hour,
            deep_pct: jitter_stage(rng, stages.deep_pct),
            rem_pct: jitter_stage(rng, stages.rem_pct),
            light_pct: jitter_stage(rng, stages.light_pct),
        })
        .collect()
}

fn jitter_stage<R: Rng + ?Sized>(rng: &mut R, pct: u32) -> u32 {
    (pct as i32 + rng.gen_range(-10..10)).clamp(0, 60) as u32
}

/// Generate a roster of `count` participants (`P001`, `P002`, ...)
pub fn generate_participants<R: Rng + ?Sized>(
    rng: &mut R,
    reference: NaiveDate,
    count: usize,
) -> Vec<ParticipantRecord> {
    (1..=count)
        .map(|i| {
            let status = PARTICIPANT_STATUSES[rng.gen_range(0..PARTICIPANT_STATUSES.len())];

            let daily_tir: Vec<u32> = (0..7).map(|_| rng.gen_range(60..90)).collect();
            let average = daily_tir.iter().sum::<u32>() as f64 / daily_tir.len() as f64;
            let delta = daily_tir[6] as i32 - daily_tir[0] as i32;
            let trend = if delta > 3 {
                Trend::Up
            } else if delta < -3 {
                Trend::Down
            } else {
                Trend::Stable
            };

            let cgm_wear_pct = rng.gen_range(85..100);
            let last_session_date = reference - Duration::days(rng.gen_range(0..3));

            ParticipantRecord {
                id: format!("P{i:03}"),
                status,
                seven_day_time_in_range_pct: average.round() as u32,
                trend,
                cgm_wear_pct,
                last_session_date,
                enrollment_date: draw_enrollment_date(rng, reference),
            }
        })
        .collect()
}

/// Aggregate the roster for the study overview cards
pub fn summarize_study(participants: &[ParticipantRecord]) -> StudySummary {
    if participants.is_empty() {
        return StudySummary::default();
    }

    let total = participants.len() as f64;
    let active = saturating_count(
        participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Active)
            .count(),
    );
    let tir_sum: u64 = participants
        .iter()
        .map(|p| u64::from(p.seven_day_time_in_range_pct))
        .sum();
    let wear_sum: u64 = participants.iter().map(|p| u64::from(p.cgm_wear_pct)).sum();

    StudySummary {
        total_participants: saturating_count(participants.len()),
        active_participants: active,
        average_time_in_range_pct: (tir_sum as f64 / total).round() as u32,
        device_compliance_pct: (wear_sum as f64 / total).round() as u32,
        sessions_this_week: active.saturating_mul(7),
    }
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Filter the roster by case-insensitive id substring and optional status
pub fn filter_participants<'a>(
    participants: &'a [ParticipantRecord],
    search: &str,
    status: Option<ParticipantStatus>,
) -> Vec<&'a ParticipantRecord> {
    let needle = search.to_lowercase();

    participants
        .iter()
        .filter(|p| p.id.to_lowercase().contains(&needle))
        .filter(|p| status.map_or(true, |s| p.status == s))
        .collect()
}

/// Four in five sessions complete; the rest split between interruptions and device issues
fn draw_session_status<R: Rng + ?Sized>(rng: &mut R) -> SessionStatus {
    match rng.gen_range(0..10) {
        0 => SessionStatus::Interrupted,
        1 => SessionStatus::DeviceIssue,
        _ => SessionStatus::Completed,
    }
}

/// Enrollment falls on day 1-28 of November 2025, December 2025 or January 2026
fn draw_enrollment_date<R: Rng + ?Sized>(rng: &mut R, fallback: NaiveDate) -> NaiveDate {
    let month_index = 10 + rng.gen_range(0..3);
    let year = 2025 + month_index / 12;
    let month = (month_index % 12) + 1;
    let day = rng.gen_range(1..=28);

    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap_or(fallback)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reference() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 20, 12, 0, 0)
            .unwrap()
    }

    fn participant(id: &str, status: ParticipantStatus, tir: u32, wear: u32) -> ParticipantRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        ParticipantRecord {
            id: id.to_string(),
            status,
            seven_day_time_in_range_pct: tir,
            trend: Trend::Stable,
            cgm_wear_pct: wear,
            last_session_date: date,
            enrollment_date: date,
        }
    }

    #[test]
    fn test_session_history_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        let sessions = generate_session_history(&mut rng, reference(), DEFAULT_SESSION_COUNT);

        assert_eq!(sessions.len(), 14);
        assert_eq!(sessions[0].id, "session-0");
        assert_eq!(sessions[0].date, reference().date_naive());
        assert_eq!(sessions[13].date, reference().date_naive() - Duration::days(13));

        for s in &sessions {
            assert!((65..90).contains(&s.session_time_in_range_pct));
            assert!((8.0..=16.0).contains(&s.total_insulin_units));
            assert!(s.hypoglycemic_event_count <= 1);
            assert_eq!(s.start_at.hour(), 22);
            assert_eq!(s.end_at.hour(), 10);
            assert_eq!(s.end_at.date_naive(), s.date);
        }
    }

    #[test]
    fn test_sleep_stages_sum_to_100() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sleep = generate_sleep_record(&mut rng, reference().date_naive());

            let stages = sleep.stages;
            assert_eq!(stages.deep_pct + stages.rem_pct + stages.light_pct, 100);
            assert!((20..35).contains(&stages.deep_pct));
            assert!((15..30).contains(&stages.rem_pct));
            assert!((85..97).contains(&sleep.efficiency_pct));
            assert!((390..510).contains(&sleep.duration_minutes));
        }
    }

    #[test]
    fn test_sleep_hourly_samples() {
        let mut rng = StdRng::seed_from_u64(9);
        let sleep = generate_sleep_record(&mut rng, reference().date_naive());

        let expected_hours = (sleep.duration_minutes + 59) / 60;
        assert_eq!(sleep.hourly_samples.len(), expected_hours as usize);

        for (i, sample) in sleep.hourly_samples.iter().enumerate() {
            assert_eq!(sample.hour, i as u32);
            assert!(sample.deep_pct <= 60);
            assert!(sample.rem_pct <= 60);
            assert!(sample.light_pct <= 60);
        }
    }

    #[test]
    fn test_sleep_duration_label() {
        let mut rng = StdRng::seed_from_u64(4);
        let sleep = generate_sleep_record(&mut rng, reference().date_naive());
        let expected = format!("{}h {}m", sleep.duration_minutes / 60, sleep.duration_minutes % 60);
        assert_eq!(sleep.duration_label, expected);
    }

    #[test]
    fn test_participants() {
        let mut rng = StdRng::seed_from_u64(2);
        let roster = generate_participants(&mut rng, reference().date_naive(), DEFAULT_PARTICIPANT_COUNT);

        assert_eq!(roster.len(), 12);
        assert_eq!(roster[0].id, "P001");
        assert_eq!(roster[11].id, "P012");

        for p in &roster {
            assert!((60..90).contains(&p.seven_day_time_in_range_pct));
            assert!((85..100).contains(&p.cgm_wear_pct));
            assert!(p.last_session_date <= reference().date_naive());
            assert!(p.last_session_date >= reference().date_naive() - Duration::days(2));

            let enrolled = p.enrollment_date;
            assert!(
                (enrolled.year() == 2025 && (11..=12).contains(&enrolled.month()))
                    || (enrolled.year() == 2026 && enrolled.month() == 1)
            );
            assert!(enrolled.day() <= 28);
        }
    }

    #[test]
    fn test_summarize_study() {
        let roster = vec![
            participant("P001", ParticipantStatus::Active, 80, 90),
            participant("P002", ParticipantStatus::Paused, 70, 95),
            participant("P003", ParticipantStatus::Active, 65, 88),
        ];

        assert_eq!(
            summarize_study(&roster),
            StudySummary {
                total_participants: 3,
                active_participants: 2,
                average_time_in_range_pct: 72,
                device_compliance_pct: 91,
                sessions_this_week: 14,
            }
        );
    }

    #[test]
    fn test_summarize_study_large_values() {
        let roster = vec![
            participant("P001", ParticipantStatus::Active, u32::MAX, 100),
            participant("P002", ParticipantStatus::Active, u32::MAX, 100),
        ];

        let summary = summarize_study(&roster);
        assert_eq!(summary.average_time_in_range_pct, u32::MAX);
        assert_eq!(summary.device_compliance_pct, 100);
        assert_eq!(summary.sessions_this_week, 14);
        assert_eq!(saturating_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_summarize_empty_study() {
        assert_eq!(summarize_study(&[]), StudySummary::default());
    }

    #[test]
    fn test_filter_participants() {
        let roster = vec![
            participant("P001", ParticipantStatus::Active, 80, 90),
            participant("P002", ParticipantStatus::Flagged, 70, 95),
            participant("P010", ParticipantStatus::Active, 65, 88),
        ];

        let ids = |v: Vec<&ParticipantRecord>| v.iter().map(|p| p.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(filter_participants(&roster, "", None)).len(), 3);
        assert_eq!(ids(filter_participants(&roster, "p01", None)), vec!["P010"]);
        assert_eq!(
            ids(filter_participants(&roster, "", Some(ParticipantStatus::Active))),
            vec!["P001", "P010"]
        );
        assert!(filter_participants(&roster, "p002", Some(ParticipantStatus::Active)).is_empty());
    }
}
