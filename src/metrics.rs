//! Metric derivation
//!
//! This module derives the scalar summaries the classifier works from:
//! - Peak and minimum frequency, and their ratio
//! - Weeks with presence
//! - Valleys (via [`crate::valley::detect_valleys`])

use crate::config::ClassificationConfig;
use crate::types::{SpeciesMetrics, WeeklyFrequency};
use crate::valley::detect_valleys;
use crate::validation::ValidationError;
use crate::week::CyclicWeek;

/// Derive all metrics for one species
pub fn calculate_metrics(
    frequencies: &WeeklyFrequency,
    config: &ClassificationConfig,
) -> Result<SpeciesMetrics, ValidationError> {
    let (peak_week, peak_frequency) = find_peak(frequencies);
    let min_frequency = compute_min_frequency(frequencies);
    let min_max_ratio = compute_min_max_ratio(min_frequency, peak_frequency);
    let weeks_with_presence = count_presence_weeks(frequencies, config.min_presence_frequency);
    let valleys = detect_valleys(frequencies, peak_frequency, config)?;

    Ok(SpeciesMetrics {
        peak_frequency,
        peak_week,
        min_frequency,
        min_max_ratio,
        weeks_with_presence,
        valleys,
    })
}

/// Highest frequency and the first week reaching it
fn find_peak(frequencies: &WeeklyFrequency) -> (CyclicWeek, f64) {
    frequencies
        .iter()
        .fold((CyclicWeek::new(0), f64::NEG_INFINITY), |best, (week, f)| {
            if f > best.1 {
                (week, f)
            } else {
                best
            }
        })
}

fn compute_min_frequency(frequencies: &WeeklyFrequency) -> f64 {
    frequencies
        .as_slice()
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min)
}

fn compute_min_max_ratio(min_frequency: f64, peak_frequency: f64) -> f64 {
    if peak_frequency > 0.0 {
        min_frequency / peak_frequency
    } else {
        0.0
    }
}

/// Weeks at or above the presence floor
fn count_presence_weeks(frequencies: &WeeklyFrequency, floor: f64) -> usize {
    frequencies.as_slice().iter().filter(|f| **f >= floor).count()
}
