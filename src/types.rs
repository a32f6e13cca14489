//! Core types for the phenology pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: validated weekly frequencies, valleys, metrics, classification
//! and timing.

use crate::validation::{validate_frequency_array, ValidationError};
use crate::week::{CyclicWeek, WeekSpan, WEEKS_PER_YEAR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weekly detection frequencies for one species, validated on construction.
///
/// Each value is the fraction of checklists that reported the species in that
/// week. Index 0 is the first week of January and the sequence is cyclic.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyFrequency([f64; WEEKS_PER_YEAR]);

impl WeeklyFrequency {
    /// Validate raw values for a species and wrap them
    pub fn new(species: &str, values: &[f64]) -> Result<Self, ValidationError> {
        validate_frequency_array(species, values)?;
        let mut weeks = [0.0; WEEKS_PER_YEAR];
        weeks.copy_from_slice(values);
        Ok(Self(weeks))
    }

    /// Frequency at a week
    pub fn at(&self, week: CyclicWeek) -> f64 {
        self.0[week.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// Weeks paired with their frequencies, in calendar order
    pub fn iter(&self) -> impl Iterator<Item = (CyclicWeek, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, f)| (CyclicWeek::new(i), *f))
    }
}

/// Named seasons used to place valleys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Summer,
}

/// Seasonal placement of a valley
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValleyType {
    Winter,
    Summer,
    Transitional,
}

/// A sustained run of low-frequency weeks (an absence period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valley {
    /// First low week
    pub start_week: CyclicWeek,
    /// Last low week; smaller than `start_week` when the valley wraps
    pub end_week: CyclicWeek,
    /// Number of consecutive low weeks
    pub length: usize,
    pub valley_type: ValleyType,
    /// Valley weeks inside the configured winter range
    pub winter_weeks: usize,
    /// Valley weeks inside the configured summer range
    pub summer_weeks: usize,
}

impl Valley {
    pub fn span(&self) -> WeekSpan {
        WeekSpan::new(self.start_week, self.end_week)
    }

    pub fn wraps(&self) -> bool {
        self.span().wraps()
    }

    pub fn is_transitional(&self) -> bool {
        self.valley_type == ValleyType::Transitional
    }

    /// Season holding more of the valley's weeks, `None` on a tie
    pub fn lean(&self) -> Option<Season> {
        match self.winter_weeks.cmp(&self.summer_weeks) {
            std::cmp::Ordering::Greater => Some(Season::Winter),
            std::cmp::Ordering::Less => Some(Season::Summer),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The tagged season, or the lean for a transitional valley
    pub fn effective_season(&self) -> Option<Season> {
        match self.valley_type {
            ValleyType::Winter => Some(Season::Winter),
            ValleyType::Summer => Some(Season::Summer),
            ValleyType::Transitional => self.lean(),
        }
    }

    /// Sort key placing wrapping valleys before week 0
    pub(crate) fn chronological_key(&self) -> isize {
        let start = self.start_week.index() as isize;
        if self.wraps() {
            start - WEEKS_PER_YEAR as isize
        } else {
            start
        }
    }
}

/// Scalar summaries derived from a species' weekly frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMetrics {
    pub peak_frequency: f64,
    /// First week attaining the peak
    pub peak_week: CyclicWeek,
    pub min_frequency: f64,
    /// `min_frequency / peak_frequency`, or 0 when the peak is 0
    pub min_max_ratio: f64,
    /// Weeks at or above the minimal presence frequency
    pub weeks_with_presence: usize,
    /// Valleys in chronological order
    pub valleys: Vec<Valley>,
}

/// Migration-pattern category, exactly one per species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Resident,
    SingleSeason,
    TwoPassageMigrant,
    Vagrant,
    Irregular,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Resident,
        Category::SingleSeason,
        Category::TwoPassageMigrant,
        Category::Vagrant,
        Category::Irregular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Resident => "resident",
            Category::SingleSeason => "single-season",
            Category::TwoPassageMigrant => "two-passage-migrant",
            Category::Vagrant => "vagrant",
            Category::Irregular => "irregular",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the timing output for a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    YearRound,
    Irregular,
    Summer,
    Winter,
    TwoPassage,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::YearRound => "year-round",
            Pattern::Irregular => "irregular",
            Pattern::Summer => "summer",
            Pattern::Winter => "winter",
            Pattern::TwoPassage => "two-passage",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic flag attached to a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    LowPeakFrequency,
    LowPresence,
    SeasonalVariation,
    Overwintering,
    TransitionalValley,
    ClassicBimodal,
    SeparatedValleys,
    CloseValleys,
    ManyValleys,
    MixedValleyWinterLean,
    MixedValleySummerLean,
    AmbiguousValley,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::LowPeakFrequency => "low_peak_frequency",
            Flag::LowPresence => "low_presence",
            Flag::SeasonalVariation => "seasonal_variation",
            Flag::Overwintering => "overwintering",
            Flag::TransitionalValley => "transitional_valley",
            Flag::ClassicBimodal => "classic_bimodal",
            Flag::SeparatedValleys => "separated_valleys",
            Flag::CloseValleys => "close_valleys",
            Flag::ManyValleys => "many_valleys",
            Flag::MixedValleyWinterLean => "mixed_valley_winter_lean",
            Flag::MixedValleySummerLean => "mixed_valley_summer_lean",
            Flag::AmbiguousValley => "ambiguous_valley",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the species classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub pattern: Pattern,
    pub flags: Vec<Flag>,
}

impl Classification {
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Arrival, peak and departure for one presence period.
///
/// Any field may be absent when the data never crosses the search threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageTiming {
    pub arrival: Option<CyclicWeek>,
    pub peak: Option<CyclicWeek>,
    pub departure: Option<CyclicWeek>,
}

/// Timing result, one variant per pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "kebab-case")]
pub enum Timing {
    YearRound,
    Irregular {
        first_appears: Option<CyclicWeek>,
        peak: Option<CyclicWeek>,
        last_appears: Option<CyclicWeek>,
    },
    Summer(PassageTiming),
    Winter(PassageTiming),
    TwoPassage {
        spring: PassageTiming,
        fall: PassageTiming,
    },
}

impl Timing {
    pub fn pattern(&self) -> Pattern {
        match self {
            Timing::YearRound => Pattern::YearRound,
            Timing::Irregular { .. } => Pattern::Irregular,
            Timing::Summer(_) => Pattern::Summer,
            Timing::Winter(_) => Pattern::Winter,
            Timing::TwoPassage { .. } => Pattern::TwoPassage,
        }
    }
}

/// Full analysis of one species
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesAnalysis {
    pub name: String,
    pub frequencies: WeeklyFrequency,
    pub metrics: SpeciesMetrics,
    pub classification: Classification,
    pub timing: Timing,
}

/// One weekly cell of raw input.
///
/// Anything that is not a JSON number (or a barchart cell that does not parse
/// as one) is kept as-is so validation can name the species and week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrequencyCell {
    Number(f64),
    NonNumeric(serde_json::Value),
}

impl FrequencyCell {
    /// Parse a barchart text cell
    pub fn parse(cell: &str) -> Self {
        cell.parse::<f64>()
            .map(FrequencyCell::Number)
            .unwrap_or_else(|_| FrequencyCell::NonNumeric(serde_json::Value::String(cell.to_string())))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FrequencyCell::Number(value) => Some(*value),
            FrequencyCell::NonNumeric(_) => None,
        }
    }
}

impl From<f64> for FrequencyCell {
    fn from(value: f64) -> Self {
        FrequencyCell::Number(value)
    }
}

impl fmt::Display for FrequencyCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyCell::Number(value) => write!(f, "{}", value),
            FrequencyCell::NonNumeric(serde_json::Value::String(text)) => write!(f, "{}", text),
            FrequencyCell::NonNumeric(other) => write!(f, "{}", other),
        }
    }
}

/// Raw species input before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesInput {
    pub species: String,
    pub frequencies: Vec<FrequencyCell>,
}

impl SpeciesInput {
    /// Input from already-numeric weekly values
    pub fn new(species: impl Into<String>, values: &[f64]) -> Self {
        Self {
            species: species.into(),
            frequencies: values.iter().copied().map(FrequencyCell::from).collect(),
        }
    }
}
