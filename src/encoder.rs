//! Species record encoding
//!
//! This module turns a species analysis into the JSON record consumed by the
//! static front end, and summarizes a batch run. Records are validated before
//! they are emitted.

use crate::calendar::week_to_date_range;
use crate::error::ComputeError;
use crate::types::{
    Category, Flag, PassageTiming, Pattern, SpeciesAnalysis, SpeciesMetrics, Timing,
};
use crate::validation::{validate_frequency_array, validate_species_code, validate_species_name};
use crate::week::CyclicWeek;
use crate::{PHENOLOGY_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One species in the output array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesRecord {
    pub name: String,
    pub code: String,
    pub category: Category,
    pub flags: Vec<Flag>,
    pub timing: TimingRecord,
    pub weekly_frequency: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SpeciesMetrics>,
}

/// Timing rendered as date-range labels.
///
/// Each shape serializes flat; absent weeks are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TimingRecord {
    Status {
        status: String,
    },
    Irregular {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        first_appears: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        peak: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_appears: Option<String>,
    },
    Passage {
        #[serde(skip_serializing_if = "Option::is_none")]
        arrival: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        peak: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        departure: Option<String>,
    },
    Winter {
        #[serde(skip_serializing_if = "Option::is_none")]
        winter_arrival: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        winter_peak: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        winter_departure: Option<String>,
    },
    TwoPassage {
        #[serde(skip_serializing_if = "Option::is_none")]
        spring_arrival: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        spring_peak: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        spring_departure: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fall_arrival: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fall_peak: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fall_departure: Option<String>,
    },
}

impl From<&Timing> for TimingRecord {
    fn from(timing: &Timing) -> Self {
        match timing {
            Timing::YearRound => TimingRecord::Status {
                status: Pattern::YearRound.as_str().to_string(),
            },
            Timing::Irregular {
                first_appears,
                peak,
                last_appears,
            } => TimingRecord::Irregular {
                status: Pattern::Irregular.as_str().to_string(),
                first_appears: label(*first_appears),
                peak: label(*peak),
                last_appears: label(*last_appears),
            },
            Timing::Summer(passage) => TimingRecord::Passage {
                arrival: label(passage.arrival),
                peak: label(passage.peak),
                departure: label(passage.departure),
            },
            Timing::Winter(passage) => TimingRecord::Winter {
                winter_arrival: label(passage.arrival),
                winter_peak: label(passage.peak),
                winter_departure: label(passage.departure),
            },
            Timing::TwoPassage { spring, fall } => two_passage_record(spring, fall),
        }
    }
}

fn two_passage_record(spring: &PassageTiming, fall: &PassageTiming) -> TimingRecord {
    TimingRecord::TwoPassage {
        spring_arrival: label(spring.arrival),
        spring_peak: label(spring.peak),
        spring_departure: label(spring.departure),
        fall_arrival: label(fall.arrival),
        fall_peak: label(fall.peak),
        fall_departure: label(fall.departure),
    }
}

fn label(week: Option<CyclicWeek>) -> Option<String> {
    week.map(|w| week_to_date_range(w).label())
}

/// Producer metadata for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// A species left out of the output, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSpecies {
    pub species: String,
    pub reason: String,
}

/// Counts and provenance for one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub producer: Producer,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub region: String,
    pub species_count: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_pattern: BTreeMap<Pattern, usize>,
    pub skipped: Vec<SkippedSpecies>,
}

/// Encoder for species records and run summaries
pub struct SpeciesEncoder {
    instance_id: String,
    include_metrics: bool,
}

impl Default for SpeciesEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeciesEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            include_metrics: false,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            include_metrics: false,
        }
    }

    /// Attach full metrics to every record
    pub fn with_metrics(mut self, include_metrics: bool) -> Self {
        self.include_metrics = include_metrics;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an analysis into a validated output record
    pub fn encode(
        &self,
        analysis: &SpeciesAnalysis,
        code: &str,
    ) -> Result<SpeciesRecord, ComputeError> {
        let record = SpeciesRecord {
            name: analysis.name.clone(),
            code: code.to_string(),
            category: analysis.classification.category,
            flags: analysis.classification.flags.clone(),
            timing: TimingRecord::from(&analysis.timing),
            weekly_frequency: analysis.frequencies.to_vec(),
            metrics: self.include_metrics.then(|| analysis.metrics.clone()),
        };

        validate_record(&record)?;
        Ok(record)
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        analysis: &SpeciesAnalysis,
        code: &str,
    ) -> Result<String, ComputeError> {
        let record = self.encode(analysis, code)?;
        serde_json::to_string_pretty(&record).map_err(ComputeError::JsonError)
    }

    /// Summarize a batch run
    pub fn summarize(
        &self,
        region: &str,
        analyses: &[SpeciesAnalysis],
        skipped: Vec<SkippedSpecies>,
    ) -> RunSummary {
        let mut by_category: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();
        let mut by_pattern = BTreeMap::new();

        for analysis in analyses {
            *by_category
                .entry(analysis.classification.category)
                .or_insert(0) += 1;
            *by_pattern
                .entry(analysis.classification.pattern)
                .or_insert(0) += 1;
        }

        RunSummary {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: PHENOLOGY_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            generated_at: Utc::now().to_rfc3339(),
            region: region.to_string(),
            species_count: analyses.len(),
            by_category,
            by_pattern,
            skipped,
        }
    }
}

/// Check a record before emission
pub fn validate_record(record: &SpeciesRecord) -> Result<(), ComputeError> {
    let result = validate_species_name(&record.name)
        .and_then(|_| validate_species_code(&record.name, &record.code))
        .and_then(|_| validate_frequency_array(&record.name, &record.weekly_frequency));

    result.map_err(|e| {
        ComputeError::EncodingError(format!("Record for '{}' is invalid: {}", record.name, e))
    })
}
