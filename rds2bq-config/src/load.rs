use std::{
    borrow::Cow,
    collections::HashMap,
    fmt, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::{Environment, UnknownEnvironment};
use crate::shared::ValidationError;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Supported extensions for base and environment configuration files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Trait implemented by the service configuration structures.
pub trait Config: DeserializeOwned {
    /// Checks invariants that deserialization alone cannot express.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Identifies which configuration file is currently being loaded.
#[derive(Debug, Clone, Copy)]
enum ConfigFileKind {
    /// Shared configuration loaded in every environment.
    Base,
    /// Environment-specific overrides (dev/prod).
    Environment(Environment),
}

impl ConfigFileKind {
    fn stem(&self) -> Cow<'static, str> {
        match self {
            ConfigFileKind::Base => Cow::Borrowed("base"),
            ConfigFileKind::Environment(env) => Cow::Owned(env.to_string()),
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::Base => f.write_str("base configuration"),
            ConfigFileKind::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// Failed to determine the current working directory.
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// A configuration file existed but could not be parsed.
    #[error("failed to load {kind_description} from `{path}`: {source}")]
    ConfigurationFileLoad {
        kind_description: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The merged sources could not be built.
    #[error("failed to initialize configuration builder: {0}")]
    Builder(#[source] config::ConfigError),

    /// A required value is absent or has the wrong shape.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),

    /// Failed to determine the runtime environment (`APP_ENVIRONMENT`).
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] UnknownEnvironment),

    /// The configuration was loaded but is not usable.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Loads and validates configuration from optional files and the process environment.
///
/// Files are read from `configuration/base.(yaml|yml|json)` and
/// `configuration/{environment}.(yaml|yml|json)` when present. Environment variables
/// override file values and use the upper-case form of the field name, for example
/// `RDS_INSTANCE_IDENTIFIER` for `rds_instance_identifier`. Empty variables count as
/// absent, so a field without a default fails loading with the field name in the error.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load()?;

    load_config_from(&base_path.join(CONFIGURATION_DIR), environment, None)
}

/// Loads and validates configuration from an explicit directory and variable set.
///
/// When `variables` is [`None`] the process environment is used.
pub fn load_config_from<T>(
    configuration_directory: &Path,
    environment: Environment,
    variables: Option<HashMap<String, String>>,
) -> Result<T, LoadConfigError>
where
    T: Config,
{
    let mut builder = config::Config::builder();

    for kind in [ConfigFileKind::Base, ConfigFileKind::Environment(environment)] {
        if let Some(path) = find_configuration_file(configuration_directory, kind) {
            builder = builder.add_source(config::File::from(path.clone()));
            validate_configuration_source(&builder, kind, &path)?;
        }
    }

    let environment_source = config::Environment::default()
        .ignore_empty(true)
        .source(variables);

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    let config = settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)?;
    config.validate()?;

    Ok(config)
}

/// Finds the configuration file that matches the requested kind, if any.
fn find_configuration_file(directory: &Path, kind: ConfigFileKind) -> Option<PathBuf> {
    if !directory.is_dir() {
        return None;
    }

    let stem = kind.stem();
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
}

fn validate_configuration_source(
    builder: &config::builder::ConfigBuilder<config::builder::DefaultState>,
    kind: ConfigFileKind,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            kind_description: kind.to_string(),
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}
