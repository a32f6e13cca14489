//! Phenology CLI - Command-line interface for migration-phenology
//!
//! Commands:
//! - classify: Classify species and write output records (batch mode)
//! - validate: Check species input without classifying
//! - week: Show the calendar date range of a week index
//! - doctor: Diagnose region configuration and environment
//! - schema: Describe the input and output formats

use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use migration_phenology::encoder::SpeciesRecord;
use migration_phenology::pipeline::{InputFormat as PipelineFormat, PhenologyProcessor, DEFAULT_REGION};
use migration_phenology::validation::{validate_frequency_cells, validate_species_name, ValidationError};
use migration_phenology::week::CyclicWeek;
use migration_phenology::{
    week_to_date_range, ComputeError, ConfigError, RegionConfig, INPUT_SCHEMA_VERSION,
    PHENOLOGY_VERSION, PRODUCER_NAME,
};

/// Phenology - Migration-pattern classification from eBird barchart data
#[derive(Parser)]
#[command(name = "phenology")]
#[command(author = "BirdFinder contributors")]
#[command(version = PHENOLOGY_VERSION)]
#[command(about = "Classify bird migration patterns from eBird barcharts", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify species and write output records (batch mode)
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "barchart")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Region id used to resolve threshold overrides
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,

        /// Directory holding regions/ and config/
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// Explicit region config file (overrides --project-root lookup)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Attach full metrics to every record
        #[arg(long)]
        include_metrics: bool,

        /// Write the run summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Check species input without classifying
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "barchart")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the calendar date range of a week index
    Week {
        /// Week index (0-47)
        week: usize,
    },

    /// Diagnose region configuration and environment
    Doctor {
        /// Region id to resolve
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,

        /// Directory holding regions/ and config/
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// eBird barchart text download (tab-separated)
    Barchart,
    /// JSON array of species
    Json,
    /// Newline-delimited JSON (one species per line)
    Ndjson,
}

impl From<InputFormat> for PipelineFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Barchart => PipelineFormat::Barchart,
            InputFormat::Json => PipelineFormat::Json,
            InputFormat::Ndjson => PipelineFormat::Ndjson,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one species record per line)
    Ndjson,
    /// JSON array of species records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Species input formats
    Input,
    /// Species output records
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Level::WARN)
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), PhenologyCliError> {
    match cli.command {
        Commands::Classify {
            input,
            output,
            input_format,
            output_format,
            region,
            project_root,
            config,
            include_metrics,
            summary,
        } => cmd_classify(
            &input,
            &output,
            input_format,
            output_format,
            &region,
            &project_root,
            config.as_deref(),
            include_metrics,
            summary.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Week { week } => cmd_week(week),

        Commands::Doctor {
            region,
            project_root,
            json,
        } => cmd_doctor(&region, &project_root, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_classify(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    region: &str,
    project_root: &Path,
    config: Option<&Path>,
    include_metrics: bool,
    summary: Option<&Path>,
) -> Result<(), PhenologyCliError> {
    let input_data = read_input(input)?;

    let region_config = match config {
        Some(path) => RegionConfig::from_file(path, region)?,
        None => RegionConfig::load(region, project_root)?,
    };

    let processor = PhenologyProcessor::with_region(&region_config)?.include_metrics(include_metrics);
    let batch = processor.process_input(&input_data, input_format.into())?;

    let output_data = format_output(&batch.records, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if let Some(summary_path) = summary {
        fs::write(summary_path, serde_json::to_string_pretty(&batch.summary)?)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PhenologyCliError> {
    let input_data = read_input(input)?;
    let species = PipelineFormat::from(input_format).parse(&input_data)?;

    let errors: Vec<ValidationErrorDetail> = species
        .iter()
        .enumerate()
        .filter_map(|(index, s)| {
            validate_species_name(&s.species)
                .and_then(|_| validate_frequency_cells(&s.species, &s.frequencies))
                .err()
                .map(|e| ValidationErrorDetail {
                    index,
                    species: s.species.clone(),
                    error: e.to_string(),
                })
        })
        .collect();

    let report = ValidationReport {
        total_species: species.len(),
        valid_species: species.len() - errors.len(),
        invalid_species: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total species:   {}", report.total_species);
        println!("Valid species:   {}", report.valid_species);
        println!("Invalid species: {}", report.invalid_species);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} (index {}): {}", err.species, err.index, err.error);
            }
        }
    }

    if report.invalid_species > 0 {
        Err(PhenologyCliError::ValidationFailed(report.invalid_species))
    } else {
        Ok(())
    }
}

fn cmd_week(week: usize) -> Result<(), PhenologyCliError> {
    let week = CyclicWeek::try_from(week)?;
    let range = week_to_date_range(week);
    println!("Week {}: {} ({})", week, range.label(), range.shorthand());
    Ok(())
}

fn cmd_doctor(region: &str, project_root: &Path, json: bool) -> Result<(), PhenologyCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "phenology_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("migration-phenology version {}", PHENOLOGY_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", INPUT_SCHEMA_VERSION),
    });

    match RegionConfig::load(region, project_root) {
        Ok(config) => {
            let source = config
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            checks.push(DoctorCheck {
                name: "region_config".to_string(),
                status: if config.config_path.is_some() {
                    CheckStatus::Ok
                } else {
                    CheckStatus::Warning
                },
                message: format!("Region '{}' ({}) from {}", config.region_id, config.display_name, source),
            });
            checks.push(DoctorCheck {
                name: "thresholds".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} threshold override(s) valid", config.thresholds.len()),
            });
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "region_config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass -i <file> for input)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (-i - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PHENOLOGY_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Phenology Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PhenologyCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), PhenologyCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", INPUT_SCHEMA_VERSION);
            println!();
            println!("Three input formats are accepted:");
            println!();
            println!("1. barchart - eBird barchart text download (tab-separated)");
            println!("   - optional 'Number of taxa:' header");
            println!("   - 'Sample Size:' line, species rows start two lines below");
            println!("   - each row: name followed by 48 weekly frequencies");
            println!("   - 'sp.' and slash taxa are skipped");
            println!();
            println!("2. json - array of {{ species, frequencies }} objects");
            println!("   - or {{ \"species_data\": [...] }}");
            println!();
            println!("3. ndjson - one {{ species, frequencies }} object per line");
            println!();
            println!("Frequencies: exactly 48 values in [0.0, 1.0], week 0 = January 1-7");
        }
        SchemaType::Output => {
            println!("Output: JSON array of species records");
            println!();
            println!("- name: Common name");
            println!("- code: 6-character species code");
            println!("- category: resident | single-season | two-passage-migrant | vagrant | irregular");
            println!("- flags: Diagnostic tags (e.g. classic_bimodal, overwintering)");
            println!("- timing: One of");
            println!("  - {{ status: year-round }}");
            println!("  - {{ status: irregular, first_appears, peak, last_appears }}");
            println!("  - {{ arrival, peak, departure }}");
            println!("  - {{ winter_arrival, winter_peak, winter_departure }}");
            println!("  - {{ spring_arrival, spring_peak, spring_departure, fall_arrival, fall_peak, fall_departure }}");
            println!("- weekly_frequency: 48 weekly frequencies");
            println!("- metrics: Peak, minimum, presence and valleys (with --include-metrics)");
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PhenologyCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output(
    records: &[SpeciesRecord],
    format: &OutputFormat,
) -> Result<String, PhenologyCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

// Error types

#[derive(Debug)]
enum PhenologyCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    Validation(ValidationError),
    Config(ConfigError),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PhenologyCliError {
    fn from(e: io::Error) -> Self {
        PhenologyCliError::Io(e)
    }
}

impl From<ComputeError> for PhenologyCliError {
    fn from(e: ComputeError) -> Self {
        PhenologyCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PhenologyCliError {
    fn from(e: serde_json::Error) -> Self {
        PhenologyCliError::Json(e)
    }
}

impl From<ValidationError> for PhenologyCliError {
    fn from(e: ValidationError) -> Self {
        PhenologyCliError::Validation(e)
    }
}

impl From<ConfigError> for PhenologyCliError {
    fn from(e: ConfigError) -> Self {
        PhenologyCliError::Config(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    error: String,
    hint: Option<String>,
}

impl From<PhenologyCliError> for CliError {
    fn from(e: PhenologyCliError) -> Self {
        match e {
            PhenologyCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                error: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PhenologyCliError::Compute(ComputeError::NoSpecies) => CliError {
                code: "NO_SPECIES".to_string(),
                error: ComputeError::NoSpecies.to_string(),
                hint: Some("Ensure the input file is not empty and --input-format matches".to_string()),
            },
            PhenologyCliError::Compute(ComputeError::Config(e)) => config_error(e),
            PhenologyCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                error: e.to_string(),
                hint: Some("Run 'phenology schema input' for accepted formats".to_string()),
            },
            PhenologyCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                error: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PhenologyCliError::Validation(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                error: e.to_string(),
                hint: None,
            },
            PhenologyCliError::Config(e) => config_error(e),
            PhenologyCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                error: format!("{} species failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PhenologyCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                error: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn config_error(e: ConfigError) -> CliError {
    CliError {
        code: "CONFIG_ERROR".to_string(),
        error: e.to_string(),
        hint: Some("Run 'phenology doctor --region <id>' to inspect region config".to_string()),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_species: usize,
    valid_species: usize,
    invalid_species: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    species: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
