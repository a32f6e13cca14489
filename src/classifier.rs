//! Migration-pattern classification
//!
//! Rules are evaluated in a fixed priority order and the first match wins:
//!
//! 1. vagrant (too few presence weeks, or too low a peak)
//! 2. resident (no valleys)
//! 3. single-season (one valley with a season)
//! 4. two-passage migrant (a winter and a summer valley, well separated)
//! 5. irregular (everything else)
//!
//! Categories are mutually exclusive; flags are informational only.

use crate::config::ClassificationConfig;
use crate::types::{
    Category, Classification, Flag, Pattern, Season, SpeciesMetrics, Valley, WeeklyFrequency,
};

/// Assign a category, timing pattern and diagnostic flags to a species
pub fn classify_species(
    metrics: &SpeciesMetrics,
    frequencies: &WeeklyFrequency,
    config: &ClassificationConfig,
) -> Classification {
    if let Some(classification) = classify_vagrant(metrics, config) {
        return classification;
    }

    let classification = match metrics.valleys.as_slice() {
        [] => classify_resident(metrics, config),
        [valley] => classify_single_valley(valley, frequencies, config),
        [first, second] => classify_two_valleys(first, second, config),
        _ => irregular(vec![Flag::ManyValleys]),
    };

    finish(classification, metrics, config)
}

/// Rule 1
fn classify_vagrant(
    metrics: &SpeciesMetrics,
    config: &ClassificationConfig,
) -> Option<Classification> {
    let too_few_weeks = metrics.weeks_with_presence < config.min_weeks_presence;
    let peak_too_low = metrics.peak_frequency < config.min_peak_frequency;

    let flags = match (too_few_weeks, peak_too_low) {
        (false, false) => return None,
        (true, _) => vec![Flag::LowPresence],
        (false, true) => vec![Flag::LowPeakFrequency],
    };

    Some(Classification {
        category: Category::Vagrant,
        pattern: Pattern::Irregular,
        flags,
    })
}

/// Rule 2
fn classify_resident(metrics: &SpeciesMetrics, config: &ClassificationConfig) -> Classification {
    let mut flags = Vec::new();
    if metrics.min_max_ratio < config.resident_seasonal_ratio {
        flags.push(Flag::SeasonalVariation);
    }
    Classification {
        category: Category::Resident,
        pattern: Pattern::YearRound,
        flags,
    }
}

/// Rule 3, falling through to rule 5 when the valley has no season
fn classify_single_valley(
    valley: &Valley,
    frequencies: &WeeklyFrequency,
    config: &ClassificationConfig,
) -> Classification {
    let mut flags = Vec::new();
    if valley.is_transitional() {
        if valley.lean().is_none() {
            return irregular(vec![Flag::AmbiguousValley]);
        }
        flags.push(Flag::TransitionalValley);
    }

    let pattern = match valley.effective_season() {
        // Absent in winter: present through summer
        Some(Season::Winter) => Pattern::Summer,
        Some(Season::Summer) => {
            if has_sustained_absence(valley, frequencies, config) {
                flags.push(Flag::Overwintering);
            }
            Pattern::Winter
        }
        None => return irregular(vec![Flag::AmbiguousValley]),
    };

    Classification {
        category: Category::SingleSeason,
        pattern,
        flags,
    }
}

/// Rule 4, falling through to rule 5 when the pair does not qualify
fn classify_two_valleys(
    first: &Valley,
    second: &Valley,
    config: &ClassificationConfig,
) -> Classification {
    let separation = first.start_week.distance(second.start_week);

    match (first.effective_season(), second.effective_season()) {
        (Some(Season::Winter), Some(Season::Summer))
        | (Some(Season::Summer), Some(Season::Winter)) => {
            if separation < config.two_passage_min_separation {
                return irregular(vec![Flag::CloseValleys]);
            }

            let clean = !first.is_transitional() && !second.is_transitional();
            let flag = if clean && separation >= config.classic_bimodal_min_separation {
                Flag::ClassicBimodal
            } else {
                Flag::SeparatedValleys
            };

            Classification {
                category: Category::TwoPassageMigrant,
                pattern: Pattern::TwoPassage,
                flags: vec![flag],
            }
        }
        (Some(Season::Winter), Some(Season::Winter)) => {
            irregular(vec![Flag::MixedValleyWinterLean])
        }
        (Some(Season::Summer), Some(Season::Summer)) => {
            irregular(vec![Flag::MixedValleySummerLean])
        }
        _ => irregular(Vec::new()),
    }
}

/// Rule 5
fn irregular(flags: Vec<Flag>) -> Classification {
    Classification {
        category: Category::Irregular,
        pattern: Pattern::Irregular,
        flags,
    }
}

/// Flags that depend on the final category
fn finish(
    mut classification: Classification,
    metrics: &SpeciesMetrics,
    config: &ClassificationConfig,
) -> Classification {
    let low_presence_cutoff = config
        .min_weeks_presence
        .saturating_add(config.low_presence_margin);
    if classification.category == Category::Irregular
        && metrics.weeks_with_presence < low_presence_cutoff
    {
        classification.flags.push(Flag::LowPresence);
    }
    classification
}

/// Whether the valley holds a long enough run of near-zero weeks to count as a
/// genuine absence rather than noise
fn has_sustained_absence(
    valley: &Valley,
    frequencies: &WeeklyFrequency,
    config: &ClassificationConfig,
) -> bool {
    let mut run = 0;
    for week in valley.span().iter() {
        if frequencies.at(week) < config.overwintering_absolute_threshold {
            run += 1;
            if run >= config.overwintering_min_weeks {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
