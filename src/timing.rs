//! Arrival, peak and departure weeks
//!
//! Timing is computed per presence segment: the stretch of weeks between
//! valleys. Each segment gets its own local peak and threshold, so a spring
//! and a fall passage of different strength are timed independently.

use crate::config::ClassificationConfig;
use crate::types::{Classification, PassageTiming, Pattern, Season, Timing, Valley, WeeklyFrequency};
use crate::week::{CyclicWeek, WeekSpan};

/// Compute timing in the shape matching the classification's pattern
pub fn calculate_timing(
    frequencies: &WeeklyFrequency,
    classification: &Classification,
    valleys: &[Valley],
    config: &ClassificationConfig,
) -> Timing {
    match classification.pattern {
        Pattern::YearRound => Timing::YearRound,
        Pattern::Irregular => irregular_timing(frequencies, config),
        Pattern::Summer => Timing::Summer(single_season_timing(frequencies, valleys, config)),
        Pattern::Winter => Timing::Winter(single_season_timing(frequencies, valleys, config)),
        Pattern::TwoPassage => {
            let (spring, fall) = two_passage_timing(frequencies, valleys, config);
            Timing::TwoPassage { spring, fall }
        }
    }
}

/// Search one presence segment for its arrival, peak and departure.
///
/// `None` stands for an empty segment and yields an all-absent result.
pub fn find_passage(
    frequencies: &WeeklyFrequency,
    segment: Option<WeekSpan>,
    config: &ClassificationConfig,
) -> PassageTiming {
    let Some(segment) = segment else {
        return PassageTiming::default();
    };
    let Some((peak_week, peak_frequency)) = local_peak(frequencies, &segment) else {
        return PassageTiming::default();
    };

    let threshold =
        (peak_frequency * config.arrival_peak_ratio).max(config.arrival_absolute_floor);
    if peak_frequency < threshold {
        return PassageTiming {
            peak: Some(peak_week),
            ..Default::default()
        };
    }

    let arrival = segment.iter().find(|w| frequencies.at(*w) >= threshold);

    let departure = WeekSpan::new(peak_week, segment.end)
        .iter()
        .find(|w| frequencies.at(*w) < threshold)
        .map(CyclicWeek::prev)
        .unwrap_or(segment.end);

    PassageTiming {
        arrival,
        peak: Some(peak_week),
        departure: Some(departure),
    }
}

/// Weeks strictly between `after` and `before`, walking forward
fn segment_between(after: CyclicWeek, before: CyclicWeek) -> Option<WeekSpan> {
    let gap = after.forward_distance(before);
    // adjacent (or identical) weeks leave nothing in between
    if gap <= 1 {
        return None;
    }
    Some(WeekSpan::new(after.next(), before.prev()))
}

/// First maximum over a segment in cyclic order
fn local_peak(frequencies: &WeeklyFrequency, segment: &WeekSpan) -> Option<(CyclicWeek, f64)> {
    segment.iter().fold(None, |best, week| {
        let f = frequencies.at(week);
        match best {
            Some((_, best_f)) if f <= best_f => best,
            _ => Some((week, f)),
        }
    })
}

/// Presence window is the complement of the single valley
fn single_season_timing(
    frequencies: &WeeklyFrequency,
    valleys: &[Valley],
    config: &ClassificationConfig,
) -> PassageTiming {
    let segment = valleys
        .first()
        .and_then(|valley| segment_between(valley.end_week, valley.start_week));
    find_passage(frequencies, segment, config)
}

/// Spring runs from the winter valley to the summer valley, fall the other way
fn two_passage_timing(
    frequencies: &WeeklyFrequency,
    valleys: &[Valley],
    config: &ClassificationConfig,
) -> (PassageTiming, PassageTiming) {
    let winter = valleys
        .iter()
        .find(|v| v.effective_season() == Some(Season::Winter));
    let summer = valleys
        .iter()
        .find(|v| v.effective_season() == Some(Season::Summer));

    match (winter, summer) {
        (Some(winter), Some(summer)) => {
            let spring = segment_between(winter.end_week, summer.start_week);
            let fall = segment_between(summer.end_week, winter.start_week);
            (
                find_passage(frequencies, spring, config),
                find_passage(frequencies, fall, config),
            )
        }
        _ => (PassageTiming::default(), PassageTiming::default()),
    }
}

/// First and last weeks with any presence, plus the global peak
fn irregular_timing(frequencies: &WeeklyFrequency, config: &ClassificationConfig) -> Timing {
    let floor = config.arrival_absolute_floor;
    let present = move || frequencies.iter().filter(move |(_, f)| *f >= floor);

    let first_appears = present().next().map(|(w, _)| w);
    let last_appears = present().last().map(|(w, _)| w);
    let peak = local_peak(frequencies, &WeekSpan::full_year())
        .filter(|(_, f)| *f > 0.0)
        .map(|(w, _)| w);

    Timing::Irregular {
        first_appears,
        peak,
        last_appears,
    }
}
