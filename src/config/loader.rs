//! Configuration loading with layered precedence.
//!
//! This module provides functions to load configuration with the precedence order
//! (lowest to highest): application defaults, configuration file, environment
//! variables, command-line arguments.
//!
//! # Architecture Note: Why Manual Layer Composition?
//!
//! The `OrthoConfig` derive macro provides `load()` and `compose_layers()` methods
//! that handle discovery, environment variables, and CLI parsing automatically.
//! This loader uses `MergeComposer` manually because the `Cli` struct owns
//! subcommand dispatch via clap, while `AppConfig` only holds configuration
//! values, and because `--config` must be honoured before falling back to the
//! discovered paths.
//!
//! # Environment Variable Handling
//!
//! Environment variables are read through [`mockable::Env`] so tests can
//! supply them without touching the process environment. Empty values are
//! treated as unset. Values are validated after the merge: an unparseable
//! `DOCKBRIDGE_API_VERSION` fails loading with a clear error rather than
//! silently falling back to negotiation.

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `DOCKBRIDGE_ENGINE_SOCKET`).
    env_var: &'static str,
    /// The configuration field it populates.
    field: &'static str,
}

/// Table of all environment variables and the fields they populate.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "DOCKBRIDGE_ENGINE_SOCKET",
        field: "engine_socket",
    },
    EnvVarSpec {
        env_var: "DOCKBRIDGE_API_VERSION",
        field: "api_version",
    },
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// This is primarily useful for tests that need to clear all `DOCKBRIDGE_*`
/// environment variables to ensure isolation.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Load a configuration file and push it to the composer.
///
/// Uses `cap_std::fs_utf8` for capability-oriented filesystem access. The
/// function opens the parent directory of the config file and reads from there.
fn load_config_file(path: &Utf8PathBuf, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value = toml::from_str::<Value>(&content).map_err(|e| ConfigError::ParseError {
        message: format!("failed to parse {path}: {e}"),
    })?;

    composer.push_file(value, Some(path.clone()));
    Ok(())
}

/// Load configuration with full layer precedence.
///
/// This function loads configuration from all available sources:
/// 1. Application defaults defined in the struct
/// 2. Configuration file (`--config`, or discovered via XDG paths or
///    `DOCKBRIDGE_CONFIG_PATH`)
/// 3. Environment variables prefixed with `DOCKBRIDGE_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// Later sources override earlier ones.
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - Malformed configuration files
/// - A `--config` path that does not exist
/// - An API version that is not a dotted numeric version
pub fn load_config<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults = serde_json::to_value(AppConfig::default()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        }
    })?;
    composer.push_defaults(defaults);

    if let Some(path) = config_file_path(cli, env)? {
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars(env);
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    // Surface a bad version here rather than at first dispatch.
    config.pinned_api_version()?;

    Ok(config)
}

/// Chooses the configuration file: an explicit `--config` (which must exist),
/// then `DOCKBRIDGE_CONFIG_PATH`, then the discovered candidates.
fn config_file_path<E: mockable::Env>(cli: &Cli, env: &E) -> Result<Option<Utf8PathBuf>> {
    if let Some(path) = cli.config.clone() {
        if !path.exists() {
            return Err(ConfigError::ParseError {
                message: format!("configuration file {path} does not exist"),
            }
            .into());
        }
        return Ok(Some(path));
    }

    if let Some(path) = env
        .string("DOCKBRIDGE_CONFIG_PATH")
        .filter(|p| !p.is_empty())
        .map(Utf8PathBuf::from)
        .filter(|p| p.exists())
    {
        return Ok(Some(path));
    }

    let discovery = ConfigDiscovery::builder("dockbridge")
        .config_file_name("config.toml")
        .dotfile_name(".dockbridge.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok()))
}

/// Collect `DOCKBRIDGE_` environment variables into a JSON object.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Value {
    let root: Map<String, Value> = ENV_VAR_SPECS
        .iter()
        .filter_map(|spec| {
            env.string(spec.env_var)
                .filter(|value| !value.is_empty())
                .map(|value| (spec.field.to_owned(), Value::String(value)))
        })
        .collect();

    if root.is_empty() {
        Value::Null
    } else {
        Value::Object(root)
    }
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref socket) = cli.engine_socket {
        overrides.insert("engine_socket".to_owned(), Value::String(socket.clone()));
    }

    if let Some(ref version) = cli.api_version {
        overrides.insert("api_version".to_owned(), Value::String(version.clone()));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
