//! eBird barchart text format
//!
//! The barchart download is tab-separated:
//!
//! ```text
//! Number of taxa:	212
//! 	Jan	Feb	...
//! Sample Size:	410	388	...
//!
//! Canada Goose	0.41	0.39	...
//! ```
//!
//! Species rows begin two lines after `Sample Size:`. Spuh and slash taxa
//! ("duck sp.", "Greater/Lesser Scaup") are set aside rather than parsed.

use crate::error::ComputeError;
use crate::types::{FrequencyCell, SpeciesInput};
use serde::{Deserialize, Serialize};

const TAXA_MARKER: &str = "Number of taxa:";
const SAMPLE_SIZE_MARKER: &str = "Sample Size:";

/// Parsed barchart download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barchart {
    /// Taxa count declared in the header, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_taxa: Option<usize>,
    /// Checklists per week
    pub sample_sizes: Vec<f64>,
    /// Species rows in file order
    pub species_data: Vec<SpeciesInput>,
    /// Spuh and slash taxa that were set aside
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_taxa: Vec<String>,
}

/// Whether a barchart row names a spuh or slash taxon
pub fn is_spot_taxon(name: &str) -> bool {
    name.contains("sp.") || name.contains('/')
}

/// Parse barchart text into species rows.
///
/// Rows are kept even when they do not hold 48 numeric values, so that the
/// frequency validation reports them by name later on.
pub fn parse_barchart(text: &str) -> Result<Barchart, ComputeError> {
    let lines: Vec<&str> = text.lines().collect();

    let mut num_taxa = None;
    let mut header = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(rest) = line.trim_start().strip_prefix(TAXA_MARKER) {
            let count = rest.trim().parse::<usize>().map_err(|e| {
                ComputeError::ParseError(format!(
                    "Invalid taxa count on line {}: {}",
                    idx + 1,
                    e
                ))
            })?;
            num_taxa = Some(count);
        }

        if let Some(rest) = line.strip_prefix(SAMPLE_SIZE_MARKER) {
            let sizes = parse_cells(rest).iter().filter_map(FrequencyCell::as_f64).collect::<Vec<_>>();
            header = Some((idx, sizes));
            break;
        }
    }

    let Some((sample_line, sample_sizes)) = header else {
        return Err(ComputeError::ParseError(format!(
            "Missing '{}' line in barchart",
            SAMPLE_SIZE_MARKER
        )));
    };

    let mut species_data = Vec::new();
    let mut skipped_taxa = Vec::new();

    for line in lines.iter().skip(sample_line + 2) {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, values)) = line.split_once('\t') else {
            continue;
        };

        let name = name.trim();
        if is_spot_taxon(name) {
            skipped_taxa.push(name.to_string());
            continue;
        }

        species_data.push(SpeciesInput {
            species: name.to_string(),
            frequencies: parse_cells(values),
        });
    }

    if let Some(expected) = num_taxa {
        let found = species_data.len() + skipped_taxa.len();
        if found != expected {
            tracing::debug!(expected, found, "barchart taxa count differs from header");
        }
    }

    Ok(Barchart {
        num_taxa,
        sample_sizes,
        species_data,
        skipped_taxa,
    })
}

/// Cells of a tab-separated row; blank cells are dropped, junk cells are kept
/// for validation to report
fn parse_cells(cells: &str) -> Vec<FrequencyCell> {
    cells
        .split('\t')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(FrequencyCell::parse)
        .collect()
}
