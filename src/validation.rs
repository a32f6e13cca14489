//! Input validation
//!
//! Malformed data is rejected before it reaches the classifier, with an error
//! naming the species and the constraint that failed. Nothing here clamps or
//! repairs values.

use crate::types::FrequencyCell;
use crate::week::WEEKS_PER_YEAR;
use thiserror::Error;

/// Lowest valid detection frequency
pub const FREQUENCY_MIN: f64 = 0.0;

/// Highest valid detection frequency
pub const FREQUENCY_MAX: f64 = 1.0;

/// eBird-style species codes are exactly six characters
pub const SPECIES_CODE_LENGTH: usize = 6;

/// Validation errors for species input and output records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Frequency array for species '{species}' must have exactly {expected} values, got {actual}")]
    WrongLength {
        species: String,
        expected: usize,
        actual: usize,
    },

    #[error("Frequency at week {week} for species '{species}' is not numeric, got '{value}'")]
    NonNumeric {
        species: String,
        week: usize,
        value: String,
    },

    #[error("Frequency at week {week} for species '{species}' is not a finite number")]
    NonFinite { species: String, week: usize },

    #[error("Frequency at week {week} for species '{species}' must be in range [0.0, 1.0], got {value}")]
    OutOfRange {
        species: String,
        week: usize,
        value: f64,
    },

    #[error("Peak frequency must be a finite value in [0.0, 1.0], got {0}")]
    InvalidPeakFrequency(f64),

    #[error("Week index must be in range [0, 47], got {0}")]
    InvalidWeek(usize),

    #[error("Invalid species name '{name}': {reason}")]
    InvalidSpeciesName { name: String, reason: String },

    #[error("Invalid species code '{code}' for species '{species}': {reason}")]
    InvalidSpeciesCode {
        species: String,
        code: String,
        reason: String,
    },

    #[error("Invalid region name '{name}': {reason}")]
    InvalidRegionName { name: String, reason: String },
}

/// Check that a frequency array has 48 finite values in `[0.0, 1.0]`
pub fn validate_frequency_array(species: &str, values: &[f64]) -> Result<(), ValidationError> {
    if values.len() != WEEKS_PER_YEAR {
        return Err(ValidationError::WrongLength {
            species: species.to_string(),
            expected: WEEKS_PER_YEAR,
            actual: values.len(),
        });
    }

    for (week, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                species: species.to_string(),
                week,
            });
        }
        if !(FREQUENCY_MIN..=FREQUENCY_MAX).contains(&value) {
            return Err(ValidationError::OutOfRange {
                species: species.to_string(),
                week,
                value,
            });
        }
    }

    Ok(())
}

/// Check raw input cells and return them as numbers.
///
/// Length is checked first, then every cell must be numeric, then the values
/// go through [`validate_frequency_array`].
pub fn validate_frequency_cells(
    species: &str,
    cells: &[FrequencyCell],
) -> Result<Vec<f64>, ValidationError> {
    if cells.len() != WEEKS_PER_YEAR {
        return Err(ValidationError::WrongLength {
            species: species.to_string(),
            expected: WEEKS_PER_YEAR,
            actual: cells.len(),
        });
    }

    let values = cells
        .iter()
        .enumerate()
        .map(|(week, cell)| {
            cell.as_f64().ok_or_else(|| ValidationError::NonNumeric {
                species: species.to_string(),
                week,
                value: cell.to_string(),
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    validate_frequency_array(species, &values)?;
    Ok(values)
}

/// Check a peak frequency handed to the valley detector
pub fn validate_peak_frequency(peak: f64) -> Result<(), ValidationError> {
    if peak.is_finite() && (FREQUENCY_MIN..=FREQUENCY_MAX).contains(&peak) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPeakFrequency(peak))
    }
}

/// Check a raw week index
pub fn validate_week_index(week: usize) -> Result<(), ValidationError> {
    if week < WEEKS_PER_YEAR {
        Ok(())
    } else {
        Err(ValidationError::InvalidWeek(week))
    }
}

/// Species names must be non-blank and must not be spuh/slash taxa
pub fn validate_species_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidSpeciesName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.contains("sp.") || name.contains('/') {
        return Err(invalid("spuh and slash taxa (sp. or /) are not species"));
    }
    Ok(())
}

/// Species codes are six lowercase ASCII alphanumerics
pub fn validate_species_code(species: &str, code: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidSpeciesCode {
        species: species.to_string(),
        code: code.to_string(),
        reason,
    };

    if code.chars().count() != SPECIES_CODE_LENGTH {
        return Err(invalid(format!(
            "must be exactly {} characters",
            SPECIES_CODE_LENGTH
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(invalid("must be lowercase alphanumeric".to_string()));
    }
    Ok(())
}

/// Region ids double as directory names
pub fn validate_region_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidRegionName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("region name cannot be empty"));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(invalid("contains path separators"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("must be alphanumeric (with _ or -)"));
    }
    Ok(())
}
