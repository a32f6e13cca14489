//! Property-based tests for valley detection, classification and timing.
//!
//! These tests verify invariants that should hold for every valid 48-week
//! frequency series, using randomly generated data.

use migration_phenology::classifier::classify_species;
use migration_phenology::config::ClassificationConfig;
use migration_phenology::metrics::calculate_metrics;
use migration_phenology::pipeline::analyze_species;
use migration_phenology::timing::calculate_timing;
use migration_phenology::types::{Category, Pattern, Timing, WeeklyFrequency};
use migration_phenology::week::WEEKS_PER_YEAR;
use proptest::prelude::*;

/// Any valid series: 48 values in [0, 1].
fn frequency_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..=1.0_f64, WEEKS_PER_YEAR)
}

/// Series built from a few blocks of presence and absence, closer to real
/// barchart shapes than uniform noise.
fn blocky_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1usize..12, prop_oneof![Just(0.0), 0.0..0.01_f64, 0.05..0.9_f64]), 1..12)
        .prop_map(|blocks| {
            let mut values: Vec<f64> = blocks
                .into_iter()
                .flat_map(|(len, f)| std::iter::repeat(f).take(len))
                .collect();
            values.resize(WEEKS_PER_YEAR, 0.0);
            values
        })
}

fn weekly(values: &[f64]) -> WeeklyFrequency {
    WeeklyFrequency::new("Test Species", values).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn valleys_never_overlap(values in blocky_strategy()) {
        let config = ClassificationConfig::default();
        let metrics = calculate_metrics(&weekly(&values), &config).unwrap();

        let mut seen = [false; WEEKS_PER_YEAR];
        for valley in &metrics.valleys {
            for week in valley.span().iter() {
                prop_assert!(!seen[week.index()], "week {} in two valleys", week);
                seen[week.index()] = true;
            }
        }
    }

    #[test]
    fn valley_lengths_are_bounded(values in frequency_strategy()) {
        let config = ClassificationConfig::default();
        let metrics = calculate_metrics(&weekly(&values), &config).unwrap();

        let total: usize = metrics.valleys.iter().map(|v| v.length).sum();
        prop_assert!(total <= WEEKS_PER_YEAR);
        for valley in &metrics.valleys {
            prop_assert!(valley.length >= config.min_valley_length);
            prop_assert_eq!(valley.length, valley.span().len());
        }
    }

    #[test]
    fn metric_invariants_hold(values in frequency_strategy()) {
        let config = ClassificationConfig::default();
        let metrics = calculate_metrics(&weekly(&values), &config).unwrap();

        prop_assert!(metrics.weeks_with_presence <= WEEKS_PER_YEAR);
        prop_assert!(0.0 <= metrics.min_frequency);
        prop_assert!(metrics.min_frequency <= metrics.peak_frequency);
        prop_assert!(metrics.peak_frequency <= 1.0);
        prop_assert_eq!(values[metrics.peak_week.index()], metrics.peak_frequency);
    }

    #[test]
    fn classification_is_total_and_idempotent(values in blocky_strategy()) {
        let config = ClassificationConfig::default();
        let frequencies = weekly(&values);
        let metrics = calculate_metrics(&frequencies, &config).unwrap();

        let first = classify_species(&metrics, &frequencies, &config);
        let second = classify_species(&metrics, &frequencies, &config);
        prop_assert_eq!(&first, &second);
        prop_assert!(Category::ALL.contains(&first.category));
    }

    #[test]
    fn timing_matches_pattern(values in blocky_strategy()) {
        let config = ClassificationConfig::default();
        let frequencies = weekly(&values);
        let metrics = calculate_metrics(&frequencies, &config).unwrap();
        let classification = classify_species(&metrics, &frequencies, &config);
        let timing = calculate_timing(&frequencies, &classification, &metrics.valleys, &config);

        prop_assert_eq!(timing.pattern(), classification.pattern);
        match classification.category {
            Category::Resident => prop_assert_eq!(timing, Timing::YearRound),
            Category::Vagrant | Category::Irregular => {
                prop_assert_eq!(classification.pattern, Pattern::Irregular)
            }
            Category::SingleSeason => prop_assert!(matches!(
                classification.pattern,
                Pattern::Summer | Pattern::Winter
            )),
            Category::TwoPassageMigrant => {
                prop_assert_eq!(classification.pattern, Pattern::TwoPassage)
            }
        }
    }

    #[test]
    fn rotation_preserves_valley_count(values in blocky_strategy(), shift in 0usize..WEEKS_PER_YEAR) {
        let config = ClassificationConfig::default();
        let mut rotated = values.clone();
        rotated.rotate_left(shift);

        let original = calculate_metrics(&weekly(&values), &config).unwrap();
        let shifted = calculate_metrics(&weekly(&rotated), &config).unwrap();

        prop_assert_eq!(original.valleys.len(), shifted.valleys.len());
        prop_assert_eq!(original.weeks_with_presence, shifted.weeks_with_presence);
    }

    #[test]
    fn out_of_range_values_are_rejected(
        values in frequency_strategy(),
        week in 0usize..WEEKS_PER_YEAR,
        bad in prop_oneof![1.0001..10.0_f64, -10.0..-0.0001_f64]
    ) {
        let mut values = values;
        values[week] = bad;
        let result = analyze_species("Test Species", &values, &ClassificationConfig::default());
        prop_assert!(result.is_err());
    }
}
