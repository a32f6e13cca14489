//! Valley detection
//!
//! A valley is a sustained run of weeks in which a species is absent or nearly
//! so. Runs are found on the cyclic year, so an absence spanning December and
//! January is one valley rather than two halves.

use crate::config::ClassificationConfig;
use crate::types::{Valley, ValleyType, WeeklyFrequency};
use crate::validation::{validate_peak_frequency, ValidationError};
use crate::week::{CyclicWeek, WeekSpan, WEEKS_PER_YEAR};

/// Low-week threshold for a given peak: a fraction of the peak, never below
/// the absolute floor
pub fn valley_threshold(peak_frequency: f64, config: &ClassificationConfig) -> f64 {
    (peak_frequency * config.valley_peak_ratio).max(config.valley_absolute_floor)
}

/// Find every valley in a species' weekly frequencies.
///
/// A week is low when its frequency is strictly below
/// [`valley_threshold`]. Maximal runs of low weeks shorter than
/// `min_valley_length` are dropped. Valleys are returned in chronological
/// order, with a valley that wraps the year boundary first.
pub fn detect_valleys(
    frequencies: &WeeklyFrequency,
    peak_frequency: f64,
    config: &ClassificationConfig,
) -> Result<Vec<Valley>, ValidationError> {
    validate_peak_frequency(peak_frequency)?;
    let threshold = valley_threshold(peak_frequency, config);
    let is_low = |week: CyclicWeek| frequencies.at(week) < threshold;

    let runs = match frequencies.iter().find(|(_, f)| *f >= threshold) {
        // Entirely low year: one valley covering the whole cycle
        None => vec![WeekSpan::full_year()],
        Some((high_week, _)) => low_runs_after(high_week, is_low),
    };

    let mut valleys: Vec<Valley> = runs
        .into_iter()
        .filter(|run| run.len() >= config.min_valley_length)
        .map(|run| tag_valley(run, config))
        .collect();

    valleys.sort_by_key(Valley::chronological_key);
    Ok(valleys)
}

/// Walk once around the cycle starting just after a high week, collecting
/// maximal runs of low weeks. Starting on a high week guarantees no run is
/// split by the scan's own starting point.
fn low_runs_after(high_week: CyclicWeek, is_low: impl Fn(CyclicWeek) -> bool) -> Vec<WeekSpan> {
    let mut runs = Vec::new();
    let mut run_start: Option<CyclicWeek> = None;

    for step in 1..=WEEKS_PER_YEAR {
        let week = high_week.offset(step as isize);
        match (is_low(week), run_start) {
            (true, None) => run_start = Some(week),
            (false, Some(start)) => {
                runs.push(WeekSpan::new(start, week.prev()));
                run_start = None;
            }
            _ => {}
        }
    }

    // The scan ends on the high week itself, so no run is left open
    debug_assert!(run_start.is_none());
    runs
}

/// Tag a run by the share of its weeks inside each configured season
fn tag_valley(run: WeekSpan, config: &ClassificationConfig) -> Valley {
    let length = run.len();
    let winter_weeks = run.overlap(&config.winter_weeks);
    let summer_weeks = run.overlap(&config.summer_weeks);

    let winter_fraction = winter_weeks as f64 / length as f64;
    let summer_fraction = summer_weeks as f64 / length as f64;
    let threshold = config.season_fraction_threshold;

    let valley_type = match (winter_fraction >= threshold, summer_fraction >= threshold) {
        (true, false) => ValleyType::Winter,
        (false, true) => ValleyType::Summer,
        (true, true) if winter_fraction > summer_fraction => ValleyType::Winter,
        (true, true) if summer_fraction > winter_fraction => ValleyType::Summer,
        _ => ValleyType::Transitional,
    };

    Valley {
        start_week: run.start,
        end_week: run.end,
        length,
        valley_type,
        winter_weeks,
        summer_weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn weekly(values: Vec<f64>) -> WeeklyFrequency {
        WeeklyFrequency::new("Test Species", &values).unwrap()
    }

    fn detect(values: Vec<f64>) -> Vec<Valley> {
        let frequencies = weekly(values);
        let peak = frequencies
            .as_slice()
            .iter()
            .cloned()
            .fold(0.0, f64::max);
        detect_valleys(&frequencies, peak, &ClassificationConfig::default()).unwrap()
    }

    fn bounds(valleys: &[Valley]) -> Vec<(usize, usize, usize)> {
        valleys
            .iter()
            .map(|v| (v.start_week.index(), v.end_week.index(), v.length))
            .collect()
    }

    #[test]
    fn test_simple_valley() {
        let mut values = vec![0.5; 48];
        values[10..15].fill(0.01);
        let valleys = detect(values);
        assert_eq!(bounds(&valleys), vec![(10, 14, 5)]);
    }

    #[test]
    fn test_wraparound_valley_is_merged() {
        let mut values = vec![0.5; 48];
        for week in [46, 47, 0, 1] {
            values[week] = 0.0;
        }
        let valleys = detect(values);
        assert_eq!(bounds(&valleys), vec![(46, 1, 4)]);
        assert!(valleys[0].wraps());
        assert_eq!(valleys[0].valley_type, ValleyType::Winter);
    }

    #[test]
    fn test_uneven_wraparound_valley() {
        let mut values = vec![0.01; 5];
        values.extend(vec![0.5; 38]);
        values.extend(vec![0.01; 5]);
        let valleys = detect(values);
        assert_eq!(bounds(&valleys), vec![(43, 4, 10)]);
    }

    #[test]
    fn test_two_valleys_in_chronological_order() {
        let mut values = vec![0.01; 8];
        values.extend(vec![0.5; 8]);
        values.extend(vec![0.01; 16]);
        values.extend(vec![0.5; 8]);
        values.extend(vec![0.01; 8]);
        let valleys = detect(values);

        assert_eq!(bounds(&valleys), vec![(40, 7, 16), (16, 31, 16)]);
        assert_eq!(valleys[0].valley_type, ValleyType::Winter);
        assert_eq!(valleys[1].valley_type, ValleyType::Summer);
    }

    #[test]
    fn test_no_valleys_for_flat_series() {
        assert!(detect(vec![0.5; 48]).is_empty());
    }

    #[test]
    fn test_short_dip_is_not_a_valley() {
        let mut values = vec![0.5; 48];
        values[20..23].fill(0.01);
        assert!(detect(values).is_empty());
    }

    #[test]
    fn test_all_zero_is_one_full_year_valley() {
        let valleys = detect(vec![0.0; 48]);
        assert_eq!(valleys.len(), 1);
        assert_eq!(valleys[0].length, 48);
        assert_eq!(valleys[0].start_week.index(), 0);
        assert_eq!(valleys[0].end_week.index(), 47);
    }

    #[test]
    fn test_threshold_uses_absolute_floor() {
        let config = ClassificationConfig::default();
        assert_eq!(valley_threshold(0.01, &config), 0.005);
        assert!((valley_threshold(0.6, &config) - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_week_at_threshold_is_not_low() {
        // peak 0.5 gives threshold 0.075; weeks exactly at 0.075 stay high
        let mut values = vec![0.5; 48];
        values[10..16].fill(0.075);
        assert!(detect(values.clone()).is_empty());

        values[10..16].fill(0.074);
        assert_eq!(detect(values).len(), 1);
    }

    #[test]
    fn test_transitional_valley() {
        // weeks 8..=15 sit between the default winter and summer ranges
        let mut values = vec![0.5; 48];
        values[8..16].fill(0.0);
        let valleys = detect(values);
        assert_eq!(valleys.len(), 1);
        assert_eq!(valleys[0].valley_type, ValleyType::Transitional);
        assert_eq!(valleys[0].winter_weeks, 0);
        assert_eq!(valleys[0].summer_weeks, 0);
    }

    #[test]
    fn test_invalid_peak_is_rejected() {
        let frequencies = weekly(vec![0.5; 48]);
        let config = ClassificationConfig::default();
        assert!(detect_valleys(&frequencies, 1.5, &config).is_err());
        assert!(detect_valleys(&frequencies, f64::NAN, &config).is_err());
    }

    #[test]
    fn test_custom_min_length() {
        let mut values = vec![0.5; 48];
        values[20..23].fill(0.0);
        let frequencies = weekly(values);
        let config = ClassificationConfig {
            min_valley_length: 3,
            ..Default::default()
        };
        let valleys = detect_valleys(&frequencies, 0.5, &config).unwrap();
        assert_eq!(valleys.len(), 1);
        assert_eq!(valleys[0].length, 3);
    }
}
