//! Print a seeded participant dashboard summary

use chrono::{FixedOffset, TimeZone};
use luna_portal::clinical::LookbackWindow;
use luna_portal::ClinicalProcessor;

fn main() {
    let Some(reference) = FixedOffset::west_opt(8 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2026, 1, 20, 9, 30, 0).single())
    else {
        eprintln!("Error: invalid reference time");
        return;
    };

    let dashboard = ClinicalProcessor::for_participant("P004").participant_dashboard(
        "P004",
        reference,
        LookbackWindow::Week,
    );

    let m = dashboard.metrics;
    println!("Participant {} ({} readings)", dashboard.participant_id, dashboard.glucose.len());
    println!(
        "  TIR {}%  TBR {}%  TAR {}%  GMI {:.1}%  CV {}%  avg {} mg/dL",
        m.time_in_range_pct,
        m.time_below_range_pct,
        m.time_above_range_pct,
        m.glucose_management_index,
        m.coefficient_of_variation_pct,
        m.average_glucose
    );
    println!("  consensus targets met: {}", dashboard.targets.all_met());
    for marker in &dashboard.insulin_markers {
        println!(
            "  {} {:.1}u at {} mg/dL",
            marker.event.timestamp.format("%H:%M"),
            marker.event.units,
            marker.glucose.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
    println!(
        "  last night: {} sleep, readiness {}",
        dashboard.sleep.duration_label, dashboard.sleep.readiness_score
    );
}
