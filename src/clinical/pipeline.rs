//! Dashboard assembly
//!
//! Ties the generators and the metrics calculator together into the two views
//! of the clinical dashboard: the per-participant detail page and the study
//! overview.

use crate::clinical::generators::{
    filter_participants, generate_participants, generate_session_history, generate_sleep_record,
    summarize_study, DEFAULT_SESSION_COUNT,
};
use crate::clinical::metrics::{MetricsCalculator, TargetReport};
use crate::clinical::timeseries::{
    anchor_insulin_events, generate_glucose_trace, generate_insulin_events, InsulinMarker,
};
use crate::clinical::types::{
    GlucosePoint, InsulinEvent, LookbackWindow, MetricsSummary, ParticipantRecord,
    ParticipantStatus, SessionRecord, SleepRecord, StudySummary,
};
use chrono::{DateTime, FixedOffset};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Everything shown on one participant's detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDashboard {
    pub participant_id: String,
    pub reference: DateTime<FixedOffset>,
    pub window: LookbackWindow,
    pub glucose: Vec<GlucosePoint>,
    pub insulin: Vec<InsulinEvent>,
    pub insulin_markers: Vec<InsulinMarker>,
    pub metrics: MetricsSummary,
    pub targets: TargetReport,
    pub sessions: Vec<SessionRecord>,
    pub sleep: SleepRecord,
}

/// Study overview: aggregate cards plus the (optionally filtered) roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyOverview {
    pub summary: StudySummary,
    pub participants: Vec<ParticipantRecord>,
}

/// Generator of mock dashboard data.
///
/// Entropy-seeded by default so every load differs. Use [`ClinicalProcessor::with_seed`]
/// or [`ClinicalProcessor::for_participant`] for reproducible output.
pub struct ClinicalProcessor {
    rng: StdRng,
}

impl Default for ClinicalProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicalProcessor {
    /// Create a processor seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a processor with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a processor whose output is stable per participant id.
    ///
    /// The seed is the numeric part of the id (`P007` -> 7), or 1 when the id
    /// has no digits.
    pub fn for_participant(participant_id: &str) -> Self {
        Self::with_seed(participant_seed(participant_id))
    }

    /// Build the detail page for one participant
    pub fn participant_dashboard(
        &mut self,
        participant_id: &str,
        reference: DateTime<FixedOffset>,
        window: LookbackWindow,
    ) -> ParticipantDashboard {
        let glucose = generate_glucose_trace(&mut self.rng, reference, window);
        let insulin = generate_insulin_events(&mut self.rng, reference);
        let metrics = MetricsCalculator::calculate(&glucose);
        let targets = MetricsCalculator::evaluate_targets(&metrics);
        let sessions = generate_session_history(&mut self.rng, reference, DEFAULT_SESSION_COUNT);
        let sleep = generate_sleep_record(&mut self.rng, reference.date_naive());
        let insulin_markers = anchor_insulin_events(&glucose, &insulin);

        log::debug!(
            "Generated dashboard for {participant_id}: {} readings, {} insulin events, TIR {}%",
            glucose.len(),
            insulin.len(),
            metrics.time_in_range_pct
        );

        ParticipantDashboard {
            participant_id: participant_id.to_string(),
            reference,
            window,
            glucose,
            insulin,
            insulin_markers,
            metrics,
            targets,
            sessions,
            sleep,
        }
    }

    /// Build the study overview. The summary always covers the full roster;
    /// `search` and `status` only narrow the listed participants.
    pub fn study_overview(
        &mut self,
        reference: DateTime<FixedOffset>,
        count: usize,
        search: &str,
        status: Option<ParticipantStatus>,
    ) -> StudyOverview {
        let roster = generate_participants(&mut self.rng, reference.date_naive(), count);
        let summary = summarize_study(&roster);
        let participants = filter_participants(&roster, search, status)
            .into_iter()
            .cloned()
            .collect();

        StudyOverview {
            summary,
            participants,
        }
    }
}

/// Eased reveal progress for the chart line draw-in (cubic ease-out, 0.0-1.0)
pub fn reveal_progress(elapsed_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 1.0;
    }
    let linear = (elapsed_ms as f64 / duration_ms as f64).min(1.0);
    1.0 - (1.0 - linear).powi(3)
}

/// Number of trace points to draw at a given reveal progress
pub fn revealed_points(total: usize, progress: f64) -> usize {
    ((total as f64) * progress.clamp(0.0, 1.0)).floor() as usize
}

fn participant_seed(participant_id: &str) -> u64 {
    let digits: String = participant_id.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok().filter(|&n| n > 0).unwrap_or(1)
}
