//! Clinical-trial analytics module
//!
//! Produces the mock data behind the clinical dashboard: a synthetic CGM trace
//! with insulin deliveries, glycemic summary metrics, session history, sleep
//! data and a participant roster.
//!
//! Pipeline: Generators (seeded RNG) → Metrics → Dashboard snapshot

pub mod generators;
pub mod metrics;
pub mod pipeline;
pub mod timeseries;
pub mod types;

pub use metrics::{MetricsCalculator, TargetReport};
pub use pipeline::{ClinicalProcessor, ParticipantDashboard, StudyOverview};
pub use types::{
    GlucosePoint, HourlySleepSample, InsulinEvent, LookbackWindow, MetricsSummary,
    ParticipantRecord, ParticipantStatus, SessionRecord, SessionStatus, SleepRecord, SleepStages,
    StudySummary, Trend,
};
