//! Console and per-run log file setup.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use gdb_reproject::store::basename;
use gdb_reproject::{LoggingConfig, MigrateError};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Parse a `--verbosity` value. Unknown values fall back to info.
pub fn parse_level(verbosity: &str) -> Level {
    match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `<prefix>-<source base>-<target base>-<YYYYMMDD-HHMMSS>.log`
pub fn log_file_name(prefix: &str, source: &Path, target: &Path, stamp: &str) -> String {
    format!(
        "{}-{}-{}-{}.log",
        prefix,
        basename(source),
        basename(target),
        stamp
    )
}

/// Where the run log goes, if anywhere.
pub struct RunLog<'a> {
    pub config: &'a LoggingConfig,
    pub source: &'a Path,
    pub target: &'a Path,
    pub fallback_dir: &'a Path,
}

impl RunLog<'_> {
    fn open(&self) -> Result<(PathBuf, File), MigrateError> {
        let dir = self.config.resolve_dir(self.fallback_dir);
        fs::create_dir_all(&dir)?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = dir.join(log_file_name(
            &self.config.file_prefix,
            self.source,
            self.target,
            &stamp,
        ));
        let file = File::create(&path)?;
        Ok((path, file))
    }
}

/// Install the global subscriber: stderr always, plus a log file when
/// `run_log` is given. Returns the log file path.
pub fn setup_logging(
    verbosity: &str,
    format: &str,
    run_log: Option<RunLog<'_>>,
) -> Result<Option<PathBuf>, MigrateError> {
    let json = format == "json";
    let mut layers: Vec<BoxedLayer> = vec![if json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    }];

    let log_path = match run_log {
        Some(run_log) => {
            let (path, file) = run_log.open()?;
            let writer = Mutex::new(file);
            layers.push(if json {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .json()
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .boxed()
            });
            Some(path)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(LevelFilter::from_level(parse_level(verbosity)))
        .try_init()
        .map_err(|e| MigrateError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(log_path)
}
