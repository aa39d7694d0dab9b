//! Configuration data types for dockbridge.

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

use crate::engine::ApiVersion;
use crate::error::ConfigError;

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `DOCKBRIDGE_CONFIG_PATH` environment variable
/// 2. `.dockbridge.toml` in the current working directory
/// 3. `.dockbridge.toml` in the home directory
/// 4. `~/.config/dockbridge/config.toml` (XDG default)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DOCKBRIDGE",
    post_merge_hook,
    discovery(
        app_name = "dockbridge",
        env_var = "DOCKBRIDGE_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".dockbridge.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine endpoint: a socket path, `unix://`, `tcp://` or
    /// `http://` URL.
    pub engine_socket: Option<String>,

    /// Engine API version to pin instead of negotiating, e.g. `1.41`.
    pub api_version: Option<String>,
}

impl AppConfig {
    /// Returns the pinned API version, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the configured text is not a
    /// dotted numeric version.
    pub fn pinned_api_version(&self) -> Result<Option<ApiVersion>, ConfigError> {
        self.api_version
            .as_deref()
            .map(str::parse::<ApiVersion>)
            .transpose()
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        self.engine_socket = self
            .engine_socket
            .take()
            .map(|socket| socket.trim().to_owned())
            .filter(|socket| !socket.is_empty());
        self.api_version = self
            .api_version
            .take()
            .map(|version| normalise_api_version(&version))
            .filter(|version| !version.is_empty());
        Ok(())
    }
}

/// Strips surrounding whitespace and a leading `v` (`v1.41` -> `1.41`).
pub(crate) fn normalise_api_version(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed)
        .to_owned()
}
