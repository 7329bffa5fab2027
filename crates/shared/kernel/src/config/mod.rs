use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Environment variable prefix; nested keys use `__`, e.g. `OPSHUB__ORCHESTRATOR__CONCURRENT_SETUP`.
pub const ENV_PREFIX: &str = "OPSHUB";

/// File stem tried in the working directory when no path is given.
pub const DEFAULT_CONFIG_STEM: &str = "opshub";

#[opshub_derive::opshub_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from a configuration file layered under environment overrides.
///
/// 1. **Base file**: the given path (required), or an optional `opshub.*` file
///    in the working directory. The format follows the file extension.
/// 2. **Environment**: variables prefixed with `OPSHUB__`; nested structures
///    use double underscores (`OPSHUB__LOGGING__LEVEL` maps to `logging.level`).
///
/// # Errors
///
/// Returns [`ConfigError::Config`] if an explicitly given file is missing, a
/// value cannot be parsed, or the merged sources do not match `T`.
///
/// # Example
/// ```rust
/// use opshub_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(path) => {
            info!("Loading config from {}", path.as_ref().display());
            File::from(path.as_ref()).required(true)
        },
        None => File::with_name(DEFAULT_CONFIG_STEM).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
