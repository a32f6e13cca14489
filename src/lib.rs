//! migration-phenology - Migration-pattern classification from eBird barchart data
//!
//! Each species' 48 weekly detection frequencies flow through a deterministic
//! pipeline: input parsing → validation → metric derivation (incl. valley
//! detection) → classification → arrival/departure timing → record encoding.
//!
//! ## Modules
//!
//! - **Core**: cyclic weeks, valley detection, metrics, classifier, timing
//! - **Input**: eBird barchart text, JSON and NDJSON species input
//! - **Output**: species records with calendar date ranges and a run summary

pub mod calendar;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod species_code;
pub mod timing;
pub mod types;
pub mod validation;
pub mod valley;
pub mod week;

pub use calendar::{week_to_date_range, DateRange};
pub use classifier::classify_species;
pub use config::{ClassificationConfig, ConfigError, RegionConfig};
pub use encoder::{RunSummary, SpeciesEncoder, SpeciesRecord};
pub use error::ComputeError;
pub use metrics::calculate_metrics;
pub use pipeline::{analyze_species, barchart_to_species_json, InputFormat, PhenologyProcessor};
pub use timing::calculate_timing;
pub use types::{
    Category, Classification, Flag, FrequencyCell, Pattern, SpeciesAnalysis, SpeciesInput,
    SpeciesMetrics, Timing, Valley, WeeklyFrequency,
};
pub use valley::detect_valleys;
pub use week::{CyclicWeek, WeekSpan};

// Schema exports
pub use schema::{parse_barchart, parse_species_array, parse_species_ndjson, INPUT_SCHEMA_VERSION};

/// Crate version embedded in every run summary
pub const PHENOLOGY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for run summaries
pub const PRODUCER_NAME: &str = "migration-phenology";
