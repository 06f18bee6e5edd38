//! gdb-reproject CLI - reproject a geodatabase into a new spatial reference.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gdb_reproject::descriptor::known_spatial_reference;
use gdb_reproject::{
    update_all_spatial_reference, Config, ConfiguredLicenses, CountVerifier, LicenseManager,
    LocalStore, MigrateError, Orchestrator, SchemaDescriptor, WorkbookInterchange,
};
use tracing::{error, info};

use crate::logging::{setup_logging, RunLog};

#[derive(Parser)]
#[command(name = "gdb-reproject")]
#[command(about = "Reproject a geodatabase into a new spatial reference")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reproject SOURCE into a freshly generated TARGET
    Migrate {
        /// Source store
        source: PathBuf,

        /// Target store (replaced if it exists)
        target: PathBuf,

        /// Work directory for descriptors, the load plan and the run record
        workdir: PathBuf,

        /// Spatial reference id of the target [default: 2263]
        spatial_reference_id: Option<u32>,
    },

    /// Compare row counts between SOURCE and an existing TARGET
    Validate {
        /// Source store
        source: PathBuf,

        /// Target store
        target: PathBuf,

        /// Directory for the run log when no log directory is configured
        /// [default: current directory]
        workdir: Option<PathBuf>,
    },

    /// Rewrite the spatial reference of a schema descriptor
    UpdateSpatialReference {
        /// Schema descriptor workbook
        descriptor: PathBuf,

        /// New spatial reference id
        spatial_reference_id: u32,

        /// Write the result here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Migrate {
            source,
            target,
            workdir,
            spatial_reference_id,
        } => {
            if let Some(id) = spatial_reference_id {
                config.migration.spatial_reference_id = id;
            }

            std::fs::create_dir_all(&workdir)?;
            let log_path = setup_logging(
                &cli.verbosity,
                &cli.log_format,
                Some(RunLog {
                    config: &config.logging,
                    source: &source,
                    target: &target,
                    fallback_dir: &workdir,
                }),
            )?;
            if let Some(ref path) = log_path {
                info!("Logging to {}", path.display());
            }

            let licenses = check_license(&config)?;
            let mut orchestrator = Orchestrator::new(
                config,
                Box::new(LocalStore::open(&source)?),
                Box::new(LocalStore::open(&target)?),
                Box::new(WorkbookInterchange::new(licenses)),
                workdir,
            );

            let result = orchestrator.run()?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nReprojection completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Spatial reference: {}", result.spatial_reference_id);
                println!("  Relationship classes: {}", result.relationships_rebuilt);
                println!("  Entities loaded: {}", result.entities_loaded);
                println!("  Rows: {}", result.rows_loaded);
                println!("  Count mismatches: {}", result.mismatch_count);
                for m in result.report.mismatches() {
                    println!(
                        "    {} - Source = {} - Target = {}",
                        m.entity_name, m.source_count, m.target_count
                    );
                }
            }
        }

        Commands::Validate {
            source,
            target,
            workdir,
        } => {
            let workdir = match workdir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let log_path = setup_logging(
                &cli.verbosity,
                &cli.log_format,
                Some(RunLog {
                    config: &config.logging,
                    source: &source,
                    target: &target,
                    fallback_dir: &workdir,
                }),
            )?;
            if let Some(ref path) = log_path {
                info!("Logging to {}", path.display());
            }

            let report = CountVerifier::validate_stores(
                &LocalStore::open(&source)?,
                &LocalStore::open(&target)?,
            )?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Validation completed");
                println!("  Entities checked: {}", report.verified().len());
                println!("  Count mismatches: {}", report.mismatch_count());
                for m in report.mismatches() {
                    println!(
                        "    {} - Source = {} - Target = {}",
                        m.entity_name, m.source_count, m.target_count
                    );
                }
            }
        }

        Commands::UpdateSpatialReference {
            descriptor,
            spatial_reference_id,
            output,
        } => {
            setup_logging(&cli.verbosity, &cli.log_format, None)?;
            let licenses = check_license(&config)?;
            let _token = licenses.acquire()?;

            let path = update_descriptor(&descriptor, spatial_reference_id, output.as_deref())?;
            if cli.output_json {
                println!(
                    "{}",
                    serde_json::json!({
                        "descriptor": path,
                        "spatial_reference_id": spatial_reference_id,
                    })
                );
            } else {
                println!(
                    "Updated {} to spatial reference {}",
                    path.display(),
                    spatial_reference_id
                );
            }
        }
    }

    Ok(())
}

/// Fail before any work if the licensed extension cannot be acquired.
fn check_license(config: &Config) -> Result<LicenseManager, MigrateError> {
    let licenses = LicenseManager::new(
        ConfiguredLicenses::new(config.license.available.clone()),
        config.license.extension.clone(),
    );
    if !licenses.is_available() {
        error!("{} license not available", licenses.extension());
        return Err(MigrateError::LicenseUnavailable(
            licenses.extension().to_string(),
        ));
    }
    info!("{} license available", licenses.extension());
    Ok(licenses)
}

fn update_descriptor(
    descriptor: &Path,
    spatial_reference_id: u32,
    output: Option<&Path>,
) -> Result<PathBuf, MigrateError> {
    known_spatial_reference(spatial_reference_id)?;
    let original = SchemaDescriptor::open(descriptor)?;
    let mut updated = match output {
        Some(out) => original.copy_to(out)?,
        None => original,
    };
    update_all_spatial_reference(&mut updated, spatial_reference_id)?;
    updated.save()?;
    Ok(updated.path().to_path_buf())
}
