//! Clinical dashboard data types
//!
//! This module defines the records produced by the mock-data generators and the
//! summary statistics derived from them. All of it is synthetic: nothing here
//! is read from a device.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lower bound of the glucose random walk (mg/dL)
pub const GLUCOSE_FLOOR: i32 = 55;
/// Upper bound of the glucose random walk (mg/dL)
pub const GLUCOSE_CEILING: i32 = 350;
/// Sample cadence of the glucose trace in minutes
pub const SAMPLE_INTERVAL_MINUTES: i64 = 5;

/// Lookback window selectable on the participant dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookbackWindow {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "14d")]
    Fortnight,
}

impl LookbackWindow {
    pub fn days(&self) -> i64 {
        match self {
            LookbackWindow::Day => 1,
            LookbackWindow::Week => 7,
            LookbackWindow::Fortnight => 14,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LookbackWindow::Day => "24h",
            LookbackWindow::Week => "7d",
            LookbackWindow::Fortnight => "14d",
        }
    }

    /// Parse the dashboard selector value ("24h", "7d", "14d")
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "24h" | "1d" | "1" => Some(LookbackWindow::Day),
            "7d" | "7" => Some(LookbackWindow::Week),
            "14d" | "14" => Some(LookbackWindow::Fortnight),
            _ => None,
        }
    }
}

/// A single CGM reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucosePoint {
    pub timestamp: DateTime<FixedOffset>,
    /// Glucose in mg/dL
    pub glucose: i32,
}

/// A discrete insulin delivery during an active session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulinEvent {
    pub timestamp: DateTime<FixedOffset>,
    /// Dose in units, one decimal place
    pub units: f64,
}

/// Clinical summary of a glucose trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Percentage of readings in 70-180 mg/dL
    pub time_in_range_pct: u32,
    /// Percentage of readings below 70 mg/dL
    pub time_below_range_pct: u32,
    /// Percentage of readings above 180 mg/dL
    pub time_above_range_pct: u32,
    /// Glucose Management Indicator (estimated A1C), one decimal place
    pub glucose_management_index: f64,
    /// Coefficient of variation (percentage)
    pub coefficient_of_variation_pct: u32,
    /// Mean glucose (mg/dL), rounded
    pub average_glucose: u32,
}

/// Outcome of a treatment session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Completed,
    Interrupted,
    #[serde(rename = "Device Issue")]
    DeviceIssue,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "Completed",
            SessionStatus::Interrupted => "Interrupted",
            SessionStatus::DeviceIssue => "Device Issue",
        }
    }
}

/// One overnight treatment session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub date: NaiveDate,
    /// Display start time ("10:00 PM")
    pub start_time: String,
    /// Display end time ("10:00 AM")
    pub end_time: String,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
    pub total_insulin_units: f64,
    pub session_time_in_range_pct: u32,
    pub hypoglycemic_event_count: u32,
    pub status: SessionStatus,
}

/// Overall sleep stage split; the three parts always sum to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepStages {
    pub deep_pct: u32,
    pub rem_pct: u32,
    pub light_pct: u32,
}

/// Per-hour stage sample. Not normalized: the parts may not sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlySleepSample {
    pub hour: u32,
    pub deep_pct: u32,
    pub rem_pct: u32,
    pub light_pct: u32,
}

/// One night of sleep-tracker data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    /// Human-readable duration ("7h 5m")
    pub duration_label: String,
    pub efficiency_pct: u32,
    pub heart_rate_variability_ms: u32,
    pub resting_heart_rate: u32,
    pub readiness_score: u32,
    pub stages: SleepStages,
    pub hourly_samples: Vec<HourlySleepSample>,
}

/// Enrollment status of a study participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantStatus {
    Active,
    Paused,
    Flagged,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Active => "Active",
            ParticipantStatus::Paused => "Paused",
            ParticipantStatus::Flagged => "Flagged",
        }
    }

    /// Case-insensitive parse of a status filter value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "active" => Some(ParticipantStatus::Active),
            "paused" => Some(ParticipantStatus::Paused),
            "flagged" => Some(ParticipantStatus::Flagged),
            _ => None,
        }
    }
}

/// Direction of a participant's time-in-range over the last week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// One row of the study roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: String,
    pub status: ParticipantStatus,
    pub seven_day_time_in_range_pct: u32,
    pub trend: Trend,
    pub cgm_wear_pct: u32,
    pub last_session_date: NaiveDate,
    pub enrollment_date: NaiveDate,
}

/// Study-wide aggregates shown above the roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySummary {
    pub total_participants: u32,
    pub active_participants: u32,
    pub average_time_in_range_pct: u32,
    pub device_compliance_pct: u32,
    pub sessions_this_week: u32,
}
