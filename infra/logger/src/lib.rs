//! # Logger
//!
//! Installs the global `tracing` subscriber for an OpsHub host: a compact
//! console layer, an optional rolling log file (plain text or JSON) written
//! through a non-blocking worker, and an `EnvFilter` seeded from the builder
//! and overridable with `RUST_LOG`.
//!
//! The builder is typestate-checked: a name is required before
//! [`LoggerBuilder::init`] is reachable, and file-only knobs
//! ([`json`](LoggerBuilder::json), [`rotation`](LoggerBuilder::rotation),
//! [`max_files`](LoggerBuilder::max_files)) exist only after a
//! [`path`](LoggerBuilder::path) was given.
//!
//! ## Example
//!
//! ```rust
//! use opshub_logger::{LevelFilter, Logger};
//!
//! let _logger = Logger::builder()
//!     .name("opshub")
//!     .level(LevelFilter::DEBUG)
//!     .env_filter("opshub_orchestrator=trace")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use opshub_domain::config::LoggingSettings;
use private::Sealed;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const DEFAULT_MAX_FILES: usize = 7;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug)]
struct LoggerConfig {
    console: bool,
    level: LevelFilter,
    directives: Option<String>,
    file: Option<FileConfig>,
}

#[derive(Debug)]
struct FileConfig {
    directory: PathBuf,
    rotation: Rotation,
    max_files: usize,
    json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { console: true, level: LevelFilter::INFO, directives: None, file: None }
    }
}

#[derive(Debug)]
pub struct Unnamed;
#[derive(Debug)]
pub struct Named(String);
#[derive(Debug)]
pub struct ConsoleOnly;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for Unnamed {}
impl Sealed for Named {}
impl Sealed for ConsoleOnly {}
impl Sealed for WithFile {}

/// Builder for the global subscriber; see the crate docs.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = Unnamed, F: Sealed = ConsoleOnly> {
    config: LoggerConfig,
    name: N,
    output: PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<Unnamed, F> {
    /// Names the application; also the log file prefix (`<name>.<date>.log`).
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named, F> {
        LoggerBuilder { config: self.config, name: Named(name.into()), output: PhantomData }
    }
}

impl<F: Sealed> LoggerBuilder<Named, F> {
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Extra `EnvFilter` directives such as `opshub_event_bus=trace`.
    ///
    /// Malformed directives make [`init`](Self::init) fail instead of being dropped.
    #[must_use]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.config.directives = Some(directives.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Writes logs to rolling files under `directory`.
    pub fn path(self, directory: impl Into<PathBuf>) -> LoggerBuilder<Named, WithFile> {
        let mut config = self.config;
        config.file = Some(FileConfig {
            directory: directory.into(),
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
        });
        LoggerBuilder { config, name: self.name, output: PhantomData }
    }

    /// Installs the subscriber.
    ///
    /// The returned [`Logger`] owns the file worker guard; keep it alive until
    /// shutdown so buffered lines are flushed.
    ///
    /// # Errors
    ///
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero
    ///   `max_files`, malformed directives or no enabled output.
    /// * [`LoggerError::Io`] / [`LoggerError::Appender`] if the log directory
    ///   or file cannot be prepared.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let name = self.name.0;
        validate(&self.config, &name)?;

        let filter = env_filter(&self.config)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if self.config.console {
            layers.push(fmt::layer().compact().with_target(true).boxed());
        }

        let guard = match &self.config.file {
            Some(file) => {
                let (layer, guard) = file_layer(&name, file)?;
                layers.push(layer);
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "no output enabled".into(),
                context: Some("enable the console or set a log path".into()),
            });
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .context("Installing the global subscriber")?;

        tracing::debug!(logger = %name, file = guard.is_some(), "Logger initialized");
        Ok(Logger { name, guard })
    }
}

impl LoggerBuilder<Named, WithFile> {
    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        if let Some(file) = &mut self.config.file {
            file.rotation = rotation;
        }
        self
    }

    /// Number of rotated files kept on disk.
    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        if let Some(file) = &mut self.config.file {
            file.max_files = max;
        }
        self
    }

    /// File output as JSON lines. The console stays human-readable.
    #[must_use]
    pub const fn json(mut self) -> Self {
        if let Some(file) = &mut self.config.file {
            file.json = true;
        }
        self
    }
}

/// Handle to the installed subscriber.
#[must_use = "dropping the logger stops the background file writer"]
#[derive(Debug)]
pub struct Logger {
    name: String,
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { config: LoggerConfig::default(), name: Unnamed, output: PhantomData }
    }

    /// Installs a subscriber from the `[logging]` section of the host configuration.
    ///
    /// # Errors
    ///
    /// [`LoggerError::InvalidConfiguration`] if `settings.level` is not a level
    /// name, otherwise as [`LoggerBuilder::init`].
    pub fn from_settings(
        name: impl Into<String>,
        settings: &LoggingSettings,
    ) -> Result<Self, LoggerError> {
        let level = parse_level(&settings.level)?;
        let mut builder = Self::builder().name(name).level(level);
        if let Some(directives) = &settings.filter {
            builder = builder.env_filter(directives.clone());
        }

        match &settings.directory {
            Some(directory) if settings.json => builder.path(directory).json().init(),
            Some(directory) => builder.path(directory).init(),
            None => builder.init(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether log lines are also written to a file.
    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!(logger = %self.name, "Flushing log files");
        }
    }
}

/// Parses `trace`, `debug`, `info`, `warn`, `error` or `off`, case-insensitively.
///
/// # Errors
///
/// [`LoggerError::InvalidConfiguration`] for anything else.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    level.trim().parse::<LevelFilter>().map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("'{level}': {e}").into(),
        context: Some("Parsing log level".into()),
    })
}

fn validate(config: &LoggerConfig, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "logger name is empty".into(),
            context: None,
        });
    }
    if config.file.as_ref().is_some_and(|file| file.max_files == 0) {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be at least 1".into(),
            context: None,
        });
    }
    Ok(())
}

fn env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    match &config.directives {
        Some(directives) => {
            builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("'{directives}': {e}").into(),
                context: Some("Parsing filter directives".into()),
            })
        },
        None => Ok(builder.from_env_lossy()),
    }
}

fn file_layer(name: &str, file: &FileConfig) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
    fs::create_dir_all(&file.directory)
        .context(format!("Creating log directory {}", file.directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(file.rotation.clone())
        .filename_prefix(name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(file.max_files)
        .build(&file.directory)
        .context("Building rolling file appender")?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    let layer = if file.json { layer.json().boxed() } else { layer.boxed() };

    Ok((layer, guard))
}
