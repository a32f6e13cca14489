//! Pipeline orchestration
//!
//! This module provides the public API for migration-phenology.
//! It orchestrates the full pipeline from species frequency input to output
//! records.

use crate::classifier::classify_species;
use crate::config::{ClassificationConfig, RegionConfig};
use crate::encoder::{RunSummary, SkippedSpecies, SpeciesEncoder, SpeciesRecord};
use crate::error::ComputeError;
use crate::metrics::calculate_metrics;
use crate::schema::{parse_barchart, parse_species_array, parse_species_ndjson, SpeciesInputAdapter};
use crate::species_code::generate_species_code;
use crate::timing::calculate_timing;
use crate::types::{SpeciesAnalysis, SpeciesInput, WeeklyFrequency};
use crate::validation::{validate_frequency_cells, validate_species_name};
use std::collections::HashSet;
use std::str::FromStr;

/// Region id used when no region configuration is supplied
pub const DEFAULT_REGION: &str = "default";

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// eBird barchart text download
    Barchart,
    /// JSON array of species (or a `species_data` wrapper)
    Json,
    /// One species object per line
    Ndjson,
}

impl InputFormat {
    /// Parse raw input into species rows
    pub fn parse(self, input: &str) -> Result<Vec<SpeciesInput>, ComputeError> {
        match self {
            InputFormat::Barchart => Ok(SpeciesInputAdapter::from_barchart(parse_barchart(input)?)),
            InputFormat::Json => parse_species_array(input),
            InputFormat::Ndjson => parse_species_ndjson(input),
        }
    }
}

impl FromStr for InputFormat {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "barchart" => Ok(InputFormat::Barchart),
            "json" => Ok(InputFormat::Json),
            "ndjson" => Ok(InputFormat::Ndjson),
            other => Err(ComputeError::ParseError(format!(
                "Unknown input format '{}'",
                other
            ))),
        }
    }
}

/// Run one species through metrics, classification and timing.
///
/// Pipeline stages:
/// 1. Validation - name and 48 frequencies in `[0, 1]`
/// 2. Metrics - peak, minimum, presence, valleys
/// 3. Classification - category, pattern and flags
/// 4. Timing - arrival, peak and departure weeks
pub fn analyze_species(
    name: &str,
    frequencies: &[f64],
    config: &ClassificationConfig,
) -> Result<SpeciesAnalysis, ComputeError> {
    validate_species_name(name)?;
    let frequencies = WeeklyFrequency::new(name, frequencies)?;

    let metrics = calculate_metrics(&frequencies, config)?;
    let classification = classify_species(&metrics, &frequencies, config);
    let timing = calculate_timing(&frequencies, &classification, &metrics.valleys, config);

    tracing::debug!(
        species = name,
        category = %classification.category,
        pattern = %classification.pattern,
        valleys = metrics.valleys.len(),
        weeks_with_presence = metrics.weeks_with_presence,
        "classified species"
    );

    Ok(SpeciesAnalysis {
        name: name.to_string(),
        frequencies,
        metrics,
        classification,
        timing,
    })
}

/// Convert eBird barchart text to the species JSON array with default
/// thresholds.
///
/// # Example
/// ```ignore
/// let json = barchart_to_species_json(&std::fs::read_to_string("ebird_US-NY.txt")?)?;
/// ```
pub fn barchart_to_species_json(barchart: &str) -> Result<String, ComputeError> {
    let processor = PhenologyProcessor::new();
    let batch = processor.process_input(barchart, InputFormat::Barchart)?;
    serde_json::to_string_pretty(&batch.records).map_err(ComputeError::JsonError)
}

/// Result of processing a batch of species
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Output records in input order
    pub records: Vec<SpeciesRecord>,
    /// Analyses backing each record, in the same order
    pub analyses: Vec<SpeciesAnalysis>,
    pub summary: RunSummary,
}

/// Batch processor carrying thresholds, region identity and encoder state.
pub struct PhenologyProcessor {
    config: ClassificationConfig,
    region_id: String,
    encoder: SpeciesEncoder,
}

impl Default for PhenologyProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PhenologyProcessor {
    /// Create a new processor with default thresholds
    pub fn new() -> Self {
        Self {
            config: ClassificationConfig::default(),
            region_id: DEFAULT_REGION.to_string(),
            encoder: SpeciesEncoder::new(),
        }
    }

    /// Create a processor with explicit thresholds
    pub fn with_config(config: ClassificationConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Create a processor from a region configuration, applying its overrides
    pub fn with_region(region: &RegionConfig) -> Result<Self, ComputeError> {
        let config = region.classification_config()?;
        Ok(Self {
            config,
            region_id: region.region_id.clone(),
            encoder: SpeciesEncoder::new(),
        })
    }

    /// Attach full metrics to every output record
    pub fn include_metrics(mut self, include: bool) -> Self {
        self.encoder = self.encoder.with_metrics(include);
        self
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    /// Parse and process raw input
    pub fn process_input(
        &self,
        input: &str,
        format: InputFormat,
    ) -> Result<BatchReport, ComputeError> {
        let species = format.parse(input)?;
        self.process(&species)
    }

    /// Process a batch of species.
    ///
    /// Species that fail validation are skipped and listed in the summary;
    /// the rest of the batch continues.
    pub fn process(&self, species: &[SpeciesInput]) -> Result<BatchReport, ComputeError> {
        if species.is_empty() {
            return Err(ComputeError::NoSpecies);
        }

        let mut records = Vec::with_capacity(species.len());
        let mut analyses = Vec::with_capacity(species.len());
        let mut skipped = Vec::new();
        let mut codes = HashSet::new();

        for input in species {
            let outcome = validate_frequency_cells(&input.species, &input.frequencies)
                .map_err(ComputeError::from)
                .and_then(|values| analyze_species(&input.species, &values, &self.config))
                .and_then(|analysis| {
                    let code = generate_species_code(&analysis.name, &codes)?;
                    Ok((analysis, code))
                });

            let (analysis, code) = match outcome {
                Ok(pair) => pair,
                Err(ComputeError::Validation(e)) => {
                    tracing::warn!(species = %input.species, error = %e, "skipping species");
                    skipped.push(SkippedSpecies {
                        species: input.species.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let record = self.encoder.encode(&analysis, &code)?;
            codes.insert(code);

            records.push(record);
            analyses.push(analysis);
        }

        let summary = self.encoder.summarize(&self.region_id, &analyses, skipped);
        tracing::info!(
            region = %self.region_id,
            classified = summary.species_count,
            skipped = summary.skipped.len(),
            "processed species batch"
        );

        Ok(BatchReport {
            records,
            analyses,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Flag, Pattern};
    use pretty_assertions::assert_eq;

    fn input(name: &str, frequencies: Vec<f64>) -> SpeciesInput {
        SpeciesInput::new(name, &frequencies)
    }

    fn summer_breeder() -> Vec<f64> {
        (0..48)
            .map(|i| if (16..36).contains(&i) { 0.75 } else { 0.0 })
            .collect()
    }

    fn two_passage() -> Vec<f64> {
        (0..48)
            .map(|i| match i {
                10..=15 => 0.6,
                36..=39 => 0.5,
                _ => 0.0,
            })
            .collect()
    }

    fn barchart_text(rows: &[(&str, Vec<f64>)]) -> String {
        let mut lines = vec![
            format!("Number of taxa:\t{}", rows.len()),
            "\tJan\t\t\t\tFeb".to_string(),
            format!("Sample Size:\t{}", vec!["120"; 48].join("\t")),
            String::new(),
        ];
        for (name, values) in rows {
            let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            lines.push(format!("{}\t{}", name, cells.join("\t")));
        }
        lines.join("\n")
    }

    #[test]
    fn test_analyze_summer_breeder() {
        let analysis =
            analyze_species("Baltimore Oriole", &summer_breeder(), &ClassificationConfig::default())
                .unwrap();
        assert_eq!(analysis.classification.category, Category::SingleSeason);
        assert_eq!(analysis.classification.pattern, Pattern::Summer);
        assert_eq!(analysis.timing.pattern(), Pattern::Summer);
    }

    #[test]
    fn test_analyze_rejects_bad_input() {
        let config = ClassificationConfig::default();
        assert!(matches!(
            analyze_species("Short Bird", &[0.1; 47], &config),
            Err(ComputeError::Validation(_))
        ));
        assert!(matches!(
            analyze_species("duck sp.", &[0.1; 48], &config),
            Err(ComputeError::Validation(_))
        ));
        let mut values = vec![0.1; 48];
        values[7] = 1.2;
        assert!(analyze_species("Loud Bird", &values, &config).is_err());
    }

    #[test]
    fn test_process_batch_preserves_order_and_skips_invalid() {
        let processor = PhenologyProcessor::new();
        let species = vec![
            input("Baltimore Oriole", summer_breeder()),
            input("Broken Bird", vec![0.1; 12]),
            input("Northern Cardinal", vec![0.6; 48]),
            input("Solitary Sandpiper", two_passage()),
        ];

        let batch = processor.process(&species).unwrap();
        let names: Vec<&str> = batch.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Baltimore Oriole", "Northern Cardinal", "Solitary Sandpiper"]
        );
        assert_eq!(batch.records[2].category, Category::TwoPassageMigrant);
        assert!(batch.records[2].flags.contains(&Flag::ClassicBimodal));

        assert_eq!(batch.summary.species_count, 3);
        assert_eq!(batch.summary.skipped.len(), 1);
        assert_eq!(batch.summary.skipped[0].species, "Broken Bird");
        assert_eq!(batch.summary.region, DEFAULT_REGION);
    }

    #[test]
    fn test_non_numeric_json_frequency_skips_only_that_species() {
        let mut broken = serde_json::json!(summer_breeder());
        broken[5] = serde_json::json!("n/a");
        let json = serde_json::json!([
            {"species": "Baltimore Oriole", "frequencies": summer_breeder()},
            {"species": "Broken Bird", "frequencies": broken},
        ])
        .to_string();

        let batch = PhenologyProcessor::new()
            .process_input(&json, InputFormat::Json)
            .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].name, "Baltimore Oriole");
        assert_eq!(batch.summary.skipped.len(), 1);
        assert_eq!(batch.summary.skipped[0].species, "Broken Bird");
        assert!(batch.summary.skipped[0].reason.contains("week 5"));
    }

    #[test]
    fn test_junk_barchart_cell_skips_row_instead_of_shifting() {
        let mut odd: Vec<String> = summer_breeder().iter().map(|v| v.to_string()).collect();
        odd[3] = "X".to_string();
        let mut long = odd.clone();
        long.push("0".to_string());

        let mut text = barchart_text(&[("Baltimore Oriole", summer_breeder())]);
        text.push_str(&format!("\nOdd Bird\t{}", odd.join("\t")));
        text.push_str(&format!("\nLong Bird\t{}", long.join("\t")));

        let batch = PhenologyProcessor::new()
            .process_input(&text, InputFormat::Barchart)
            .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].name, "Baltimore Oriole");

        let skipped: Vec<&str> = batch
            .summary
            .skipped
            .iter()
            .map(|s| s.species.as_str())
            .collect();
        assert_eq!(skipped, vec!["Odd Bird", "Long Bird"]);
        assert!(batch.summary.skipped[0].reason.contains("week 3"));
        assert!(batch.summary.skipped[1].reason.contains("got 49"));
    }

    #[test]
    fn test_codes_are_unique_within_batch() {
        let processor = PhenologyProcessor::new();
        let species = vec![
            input("Black-throated Blue Warbler", vec![0.5; 48]),
            input("Black-throated Green Warbler", vec![0.5; 48]),
        ];
        let batch = processor.process(&species).unwrap();
        assert_eq!(batch.records[0].code, "blawar");
        assert_eq!(batch.records[1].code, "blwarb");
    }

    #[test]
    fn test_empty_batch() {
        let processor = PhenologyProcessor::new();
        assert!(matches!(processor.process(&[]), Err(ComputeError::NoSpecies)));
    }

    #[test]
    fn test_barchart_to_species_json() {
        let text = barchart_text(&[
            ("Baltimore Oriole", summer_breeder()),
            ("peep sp.", vec![0.2; 48]),
            ("Northern Cardinal", vec![0.6; 48]),
        ]);
        let json = barchart_to_species_json(&text).unwrap();
        let records: serde_json::Value = serde_json::from_str(&json).unwrap();
        let records = records.as_array().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["code"], "balori");
        assert_eq!(records[0]["timing"]["arrival"], "May 1-7");
        assert_eq!(records[1]["timing"]["status"], "year-round");
    }

    #[test]
    fn test_process_input_formats() {
        let processor = PhenologyProcessor::new();
        let line = serde_json::json!({"species": "Sora", "frequencies": summer_breeder()});

        let json = format!("[{}]", line);
        let batch = processor.process_input(&json, InputFormat::Json).unwrap();
        assert_eq!(batch.records.len(), 1);

        let ndjson = format!("{}\n", line);
        let batch = processor.process_input(&ndjson, InputFormat::Ndjson).unwrap();
        assert_eq!(batch.records[0].code, "soraso");

        assert!("csv".parse::<InputFormat>().is_err());
        assert_eq!("ndjson".parse::<InputFormat>().unwrap(), InputFormat::Ndjson);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ClassificationConfig {
            valley_peak_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            PhenologyProcessor::with_config(config),
            Err(ComputeError::Config(_))
        ));
    }

    #[test]
    fn test_region_overrides_flow_into_processor() {
        let mut region = RegionConfig::default_for("test-region");
        region
            .thresholds
            .insert("MIN_WEEKS_PRESENCE".to_string(), 30.0);
        let processor = PhenologyProcessor::with_region(&region).unwrap();
        assert_eq!(processor.region_id(), "test-region");

        let batch = processor
            .process(&[input("Baltimore Oriole", summer_breeder())])
            .unwrap();
        assert_eq!(batch.records[0].category, Category::Vagrant);
    }
}
