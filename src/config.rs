//! Classification thresholds and region configuration
//!
//! Every component receives a [`ClassificationConfig`] by reference; nothing
//! reads global constants. Regions may override individual thresholds and the
//! seasonal week ranges through a JSON [`RegionConfig`].

use crate::validation::validate_region_name;
use crate::week::{WeekSpan, WEEKS_PER_YEAR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default timezone for regions that do not declare one
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Region ID mismatch: config says '{found}' but loading for '{expected}'")]
    RegionMismatch { expected: String, found: String },

    #[error("Region '{region}' not found in {path}; available regions: {available}")]
    RegionNotFound {
        region: String,
        path: PathBuf,
        available: String,
    },

    #[error("Invalid region id: {0}")]
    InvalidRegion(#[from] crate::validation::ValidationError),

    #[error("display_name cannot be empty")]
    EmptyDisplayName,

    #[error("Unknown threshold '{0}'")]
    UnknownThreshold(String),

    #[error("Threshold '{name}' is invalid: {reason}")]
    InvalidThreshold { name: String, reason: String },

    #[error("Seasonal weeks for '{season}' are invalid: {reason}")]
    InvalidSeason { season: String, reason: String },
}

/// Thresholds and seasonal ranges driving valley detection, classification
/// and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Valley threshold as a fraction of the species' peak
    pub valley_peak_ratio: f64,
    /// Weeks below this are always low
    pub valley_absolute_floor: f64,
    /// Shortest run of low weeks counted as a valley
    pub min_valley_length: usize,
    /// Fraction of a valley inside a season needed to tag it with that season
    pub season_fraction_threshold: f64,
    pub winter_weeks: WeekSpan,
    pub summer_weeks: WeekSpan,

    /// Weeks at or above this frequency count toward presence
    pub min_presence_frequency: f64,
    /// Fewer presence weeks than this makes a vagrant
    pub min_weeks_presence: usize,
    /// A lower peak than this makes a vagrant
    pub min_peak_frequency: f64,
    /// Residents below this min/max ratio get `seasonal_variation`
    pub resident_seasonal_ratio: f64,
    /// Presence weeks above the vagrant cutoff still flagged `low_presence`
    pub low_presence_margin: usize,
    pub overwintering_min_weeks: usize,
    pub overwintering_absolute_threshold: f64,
    /// Cyclic distance between valley starts required for two passages
    pub two_passage_min_separation: usize,
    pub classic_bimodal_min_separation: usize,

    /// Arrival/departure threshold as a fraction of the local peak
    pub arrival_peak_ratio: f64,
    pub arrival_absolute_floor: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            valley_peak_ratio: 0.15,
            valley_absolute_floor: 0.005,
            min_valley_length: 4,
            season_fraction_threshold: 0.40,
            winter_weeks: WeekSpan::from_indices(44, 7),
            summer_weeks: WeekSpan::from_indices(16, 35),

            min_presence_frequency: 0.001,
            min_weeks_presence: 10,
            min_peak_frequency: 0.005,
            resident_seasonal_ratio: 0.5,
            low_presence_margin: 5,
            overwintering_min_weeks: 8,
            overwintering_absolute_threshold: 0.001,
            two_passage_min_separation: 12,
            classic_bimodal_min_separation: 16,

            arrival_peak_ratio: 0.10,
            arrival_absolute_floor: 0.001,
        }
    }
}

impl ClassificationConfig {
    /// Reject thresholds that would make the rules meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("VALLEY_THRESHOLD_PEAK_RATIO", self.valley_peak_ratio),
            ("VALLEY_THRESHOLD_ABSOLUTE", self.valley_absolute_floor),
            ("SEASON_FRACTION_THRESHOLD", self.season_fraction_threshold),
            ("MIN_PRESENCE_FREQUENCY", self.min_presence_frequency),
            ("MIN_PEAK_FREQUENCY", self.min_peak_frequency),
            ("RESIDENT_SEASONAL_VARIATION_RATIO", self.resident_seasonal_ratio),
            (
                "OVERWINTERING_ABSOLUTE_THRESHOLD",
                self.overwintering_absolute_threshold,
            ),
            ("ARRIVAL_THRESHOLD_PEAK_RATIO", self.arrival_peak_ratio),
            ("ARRIVAL_THRESHOLD_ABSOLUTE", self.arrival_absolute_floor),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    name: name.to_string(),
                    reason: format!("must be in range [0.0, 1.0], got {}", value),
                });
            }
        }

        let weeks = [
            ("VALLEY_MIN_LENGTH_WEEKS", self.min_valley_length),
            ("MIN_WEEKS_PRESENCE", self.min_weeks_presence),
            ("OVERWINTERING_MIN_WEEKS", self.overwintering_min_weeks),
            ("TWO_PASSAGE_MIN_SEPARATION", self.two_passage_min_separation),
            (
                "CLASSIC_BIMODAL_MIN_SEPARATION",
                self.classic_bimodal_min_separation,
            ),
        ];
        for (name, value) in weeks {
            if value == 0 || value > WEEKS_PER_YEAR {
                return Err(ConfigError::InvalidThreshold {
                    name: name.to_string(),
                    reason: format!("must be between 1 and {} weeks, got {}", WEEKS_PER_YEAR, value),
                });
            }
        }

        if self.low_presence_margin > WEEKS_PER_YEAR {
            return Err(ConfigError::InvalidThreshold {
                name: "LOW_PRESENCE_MARGIN".to_string(),
                reason: format!(
                    "must be between 0 and {} weeks, got {}",
                    WEEKS_PER_YEAR, self.low_presence_margin
                ),
            });
        }

        if self.winter_weeks.overlap(&self.summer_weeks) > 0 {
            return Err(ConfigError::InvalidSeason {
                season: "summer".to_string(),
                reason: "summer range overlaps the winter range".to_string(),
            });
        }

        Ok(())
    }

    /// Apply one named override, using the upper-case names of region config files
    pub fn set_threshold(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: name.to_string(),
                reason: format!("cannot be negative, got {}", value),
            });
        }

        match name {
            "VALLEY_THRESHOLD_PEAK_RATIO" => self.valley_peak_ratio = value,
            "VALLEY_THRESHOLD_ABSOLUTE" => self.valley_absolute_floor = value,
            "VALLEY_MIN_LENGTH_WEEKS" => self.min_valley_length = whole_weeks(name, value)?,
            "SEASON_FRACTION_THRESHOLD" => self.season_fraction_threshold = value,
            "MIN_PRESENCE_FREQUENCY" => self.min_presence_frequency = value,
            "MIN_WEEKS_PRESENCE" => self.min_weeks_presence = whole_weeks(name, value)?,
            "MIN_PEAK_FREQUENCY" => self.min_peak_frequency = value,
            "RESIDENT_SEASONAL_VARIATION_RATIO" => self.resident_seasonal_ratio = value,
            "LOW_PRESENCE_MARGIN" => self.low_presence_margin = whole_weeks(name, value)?,
            "OVERWINTERING_MIN_WEEKS" => {
                self.overwintering_min_weeks = whole_weeks(name, value)?
            }
            "OVERWINTERING_ABSOLUTE_THRESHOLD" => self.overwintering_absolute_threshold = value,
            "TWO_PASSAGE_MIN_SEPARATION" => {
                self.two_passage_min_separation = whole_weeks(name, value)?
            }
            "CLASSIC_BIMODAL_MIN_SEPARATION" => {
                self.classic_bimodal_min_separation = whole_weeks(name, value)?
            }
            "ARRIVAL_THRESHOLD_PEAK_RATIO" => self.arrival_peak_ratio = value,
            "ARRIVAL_THRESHOLD_ABSOLUTE" => self.arrival_absolute_floor = value,
            _ => return Err(ConfigError::UnknownThreshold(name.to_string())),
        }
        Ok(())
    }
}

fn whole_weeks(name: &str, value: f64) -> Result<usize, ConfigError> {
    if value.fract() != 0.0 {
        return Err(ConfigError::InvalidThreshold {
            name: name.to_string(),
            reason: format!("must be a whole number of weeks, got {}", value),
        });
    }
    Ok(value as usize)
}

/// Inclusive week range as written in region config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRange {
    pub start: usize,
    pub end: usize,
}

impl SeasonRange {
    fn to_span(self, season: &str) -> Result<WeekSpan, ConfigError> {
        for (label, week) in [("start", self.start), ("end", self.end)] {
            if week >= WEEKS_PER_YEAR {
                return Err(ConfigError::InvalidSeason {
                    season: season.to_string(),
                    reason: format!("{} must be in range [0, 47], got {}", label, week),
                });
            }
        }
        Ok(WeekSpan::from_indices(self.start, self.end))
    }
}

/// Per-region settings loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default)]
    pub region_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ebird_region_code: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Threshold overrides keyed by upper-case constant name
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    /// Seasonal range overrides keyed by season name
    #[serde(default)]
    pub seasonal_weeks: BTreeMap<String, SeasonRange>,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Debug, Deserialize)]
struct MultiRegionFile {
    regions: BTreeMap<String, RegionConfig>,
}

impl RegionConfig {
    /// Minimal config for a region with no file, display name title-cased from the id
    pub fn default_for(region_id: &str) -> Self {
        let display_name = region_id
            .split(['_', '-'])
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            region_id: region_id.to_string(),
            description: format!("Default configuration for {}", display_name),
            display_name,
            ebird_region_code: String::new(),
            timezone: default_timezone(),
            thresholds: BTreeMap::new(),
            seasonal_weeks: BTreeMap::new(),
            config_path: None,
        }
    }

    /// Resolve a region's configuration under `project_root`.
    ///
    /// Looks at `regions/<id>/config.json`, then `config/regions.json`, then
    /// falls back to [`RegionConfig::default_for`].
    pub fn load(region_id: &str, project_root: &Path) -> Result<Self, ConfigError> {
        validate_region_name(region_id)?;

        let region_path = project_root
            .join("regions")
            .join(region_id)
            .join("config.json");
        if region_path.exists() {
            return Self::from_file(&region_path, region_id);
        }

        let global_path = project_root.join("config").join("regions.json");
        if global_path.exists() {
            return Self::from_multi_region_file(&global_path, region_id);
        }

        tracing::debug!(region = region_id, "no region config found, using defaults");
        Ok(Self::default_for(region_id))
    }

    /// Load a single-region config file
    pub fn from_file(path: &Path, region_id: &str) -> Result<Self, ConfigError> {
        let mut config: RegionConfig = read_json(path)?;

        if config.region_id.is_empty() {
            config.region_id = region_id.to_string();
        } else if config.region_id != region_id {
            return Err(ConfigError::RegionMismatch {
                expected: region_id.to_string(),
                found: config.region_id,
            });
        }
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Load one region out of a `{"regions": {...}}` file
    pub fn from_multi_region_file(path: &Path, region_id: &str) -> Result<Self, ConfigError> {
        let file: MultiRegionFile = read_json(path)?;
        let available = file.regions.keys().cloned().collect::<Vec<_>>().join(", ");

        let mut config = file
            .regions
            .get(region_id)
            .cloned()
            .ok_or_else(|| ConfigError::RegionNotFound {
                region: region_id.to_string(),
                path: path.to_path_buf(),
                available,
            })?;

        config.region_id = region_id.to_string();
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Structural checks on a loaded config
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_region_name(&self.region_id)?;
        if self.display_name.trim().is_empty() {
            return Err(ConfigError::EmptyDisplayName);
        }
        self.classification_config().map(|_| ())
    }

    /// Default thresholds with this region's overrides applied
    pub fn classification_config(&self) -> Result<ClassificationConfig, ConfigError> {
        let mut config = ClassificationConfig::default();

        for (name, value) in &self.thresholds {
            config.set_threshold(name, *value)?;
        }

        for (season, range) in &self.seasonal_weeks {
            match season.as_str() {
                "winter" => config.winter_weeks = range.to_span(season)?,
                "summer" => config.summer_weeks = range.to_span(season)?,
                // spring/fall windows are carried for display only
                "spring" | "fall" => {
                    range.to_span(season)?;
                }
                _ => {
                    return Err(ConfigError::InvalidSeason {
                        season: season.clone(),
                        reason: "unknown season".to_string(),
                    })
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClassificationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.winter_weeks.len(), 12);
        assert_eq!(config.summer_weeks.len(), 20);
    }

    #[test]
    fn test_threshold_override() {
        let mut config = ClassificationConfig::default();
        config
            .set_threshold("VALLEY_THRESHOLD_PEAK_RATIO", 0.2)
            .unwrap();
        config.set_threshold("MIN_WEEKS_PRESENCE", 8.0).unwrap();
        assert_eq!(config.valley_peak_ratio, 0.2);
        assert_eq!(config.min_weeks_presence, 8);

        assert!(matches!(
            config.set_threshold("NOT_A_THRESHOLD", 1.0),
            Err(ConfigError::UnknownThreshold(_))
        ));
        assert!(config.set_threshold("MIN_WEEKS_PRESENCE", 8.5).is_err());
        assert!(config.set_threshold("MIN_PEAK_FREQUENCY", -0.1).is_err());
    }

    #[test]
    fn test_low_presence_margin_is_bounded() {
        let mut region = RegionConfig::default_for("test");
        region
            .thresholds
            .insert("LOW_PRESENCE_MARGIN".to_string(), 1e20);
        assert!(matches!(
            region.classification_config(),
            Err(ConfigError::InvalidThreshold { name, .. }) if name == "LOW_PRESENCE_MARGIN"
        ));

        let config = ClassificationConfig {
            low_presence_margin: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_ratio_above_one() {
        let config = ClassificationConfig {
            arrival_peak_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_region_config() {
        let config = RegionConfig::default_for("washtenaw_county");
        assert_eq!(config.display_name, "Washtenaw County");
        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert_eq!(
            config.classification_config().unwrap(),
            ClassificationConfig::default()
        );
    }

    #[test]
    fn test_load_region_file_with_overrides() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let region_dir = root.join("regions").join("washtenaw");
        fs::create_dir_all(&region_dir).unwrap();
        fs::write(
            region_dir.join("config.json"),
            r#"{
                "display_name": "Washtenaw County, Michigan",
                "ebird_region_code": "US-MI-161",
                "thresholds": {"MIN_WEEKS_PRESENCE": 12},
                "seasonal_weeks": {"summer": {"start": 18, "end": 33}}
            }"#,
        )
        .unwrap();

        let config = RegionConfig::load("washtenaw", root).unwrap();
        assert_eq!(config.region_id, "washtenaw");
        assert_eq!(config.ebird_region_code, "US-MI-161");

        let thresholds = config.classification_config().unwrap();
        assert_eq!(thresholds.min_weeks_presence, 12);
        assert_eq!(thresholds.summer_weeks, WeekSpan::from_indices(18, 33));

    }

    #[test]
    fn test_region_mismatch() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let region_dir = root.join("regions").join("alpha");
        fs::create_dir_all(&region_dir).unwrap();
        fs::write(
            region_dir.join("config.json"),
            r#"{"region_id": "beta", "display_name": "Beta"}"#,
        )
        .unwrap();

        assert!(matches!(
            RegionConfig::load("alpha", root),
            Err(ConfigError::RegionMismatch { .. })
        ));
    }

    #[test]
    fn test_multi_region_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(
            root.join("config").join("regions.json"),
            r#"{"regions": {"kalamazoo": {"display_name": "Kalamazoo County"}}}"#,
        )
        .unwrap();

        let config = RegionConfig::load("kalamazoo", root).unwrap();
        assert_eq!(config.display_name, "Kalamazoo County");

        match RegionConfig::load("ottawa", root) {
            Err(ConfigError::RegionNotFound { available, .. }) => {
                assert_eq!(available, "kalamazoo")
            }
            other => panic!("expected RegionNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_region_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let config = RegionConfig::load("new-region", root).unwrap();
        assert_eq!(config.display_name, "New Region");
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_invalid_season_range() {
        let mut config = RegionConfig::default_for("test");
        config
            .seasonal_weeks
            .insert("winter".to_string(), SeasonRange { start: 44, end: 52 });
        assert!(matches!(
            config.classification_config(),
            Err(ConfigError::InvalidSeason { .. })
        ));
    }
}
