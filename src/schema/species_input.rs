//! JSON species input
//!
//! Accepts a bare array of `{"species", "frequencies"}` objects, the wrapped
//! `{"species_data": [...]}` document written by the barchart parse step, or
//! NDJSON with one object per line.

use crate::error::ComputeError;
use crate::schema::barchart::{is_spot_taxon, Barchart};
use crate::types::SpeciesInput;
use serde::Deserialize;

/// Current input schema identifier
pub const INPUT_SCHEMA_VERSION: &str = "phenology.species_input.v1";

#[derive(Deserialize)]
#[serde(untagged)]
enum SpeciesDocument {
    Array(Vec<SpeciesInput>),
    Wrapped { species_data: Vec<SpeciesInput> },
}

/// Adapter for species input documents
pub struct SpeciesInputAdapter;

impl SpeciesInputAdapter {
    /// Parse a JSON array (or `species_data` wrapper) of species
    pub fn parse_array(json: &str) -> Result<Vec<SpeciesInput>, ComputeError> {
        let document: SpeciesDocument = serde_json::from_str(json).map_err(|e| {
            ComputeError::ParseError(format!(
                "Expected an array of species or an object with 'species_data': {}",
                e
            ))
        })?;
        Ok(match document {
            SpeciesDocument::Array(species) => species,
            SpeciesDocument::Wrapped { species_data } => species_data,
        })
    }

    /// Parse NDJSON (newline-delimited JSON) containing one species per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SpeciesInput>, ComputeError> {
        let mut species = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SpeciesInput>(trimmed) {
                Ok(input) => species.push(input),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(species)
    }

    /// Species from a parsed barchart, minus any spot taxa
    pub fn from_barchart(barchart: Barchart) -> Vec<SpeciesInput> {
        barchart
            .species_data
            .into_iter()
            .filter(|s| !is_spot_taxon(&s.species))
            .collect()
    }
}

/// Parse a JSON array of species
pub fn parse_species_array(json: &str) -> Result<Vec<SpeciesInput>, ComputeError> {
    SpeciesInputAdapter::parse_array(json)
}

/// Parse NDJSON species input
pub fn parse_species_ndjson(ndjson: &str) -> Result<Vec<SpeciesInput>, ComputeError> {
    SpeciesInputAdapter::parse_ndjson(ndjson)
}
