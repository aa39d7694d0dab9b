//! Engine endpoint resolution.
//!
//! This module decides how the engine is addressed: over a Unix domain socket
//! or over plain HTTP on a TCP endpoint. The endpoint is resolved once, when
//! the adapter is constructed, through a priority-based fallback chain:
//!
//! 1. Configured endpoint (`--engine-socket`, config file, or
//!    `DOCKBRIDGE_ENGINE_SOCKET`)
//! 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST`
//! 3. Platform default (`/var/run/docker.sock` on Unix,
//!    `http://localhost:2375` elsewhere)
//!
//! Socket endpoints only exist on Unix; elsewhere `unix://` and bare paths
//! are rejected when parsed.

use std::fmt;

#[cfg(unix)]
use camino::Utf8PathBuf;

use crate::error::ConfigError;

/// Environment variable names checked in fallback order after configuration.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Default socket path on platforms with Unix domain sockets.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Default TCP authority on platforms without Unix domain sockets.
pub const DEFAULT_TCP_AUTHORITY: &str = "localhost:2375";

/// Where the engine listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEndpoint {
    /// A filesystem socket to dial directly.
    #[cfg(unix)]
    Unix(Utf8PathBuf),
    /// An HTTP endpoint, given as `host:port`. No filesystem socket is involved.
    Tcp {
        /// The `host:port` authority to dial.
        authority: String,
    },
}

impl EngineEndpoint {
    /// Returns the endpoint used when nothing is configured: the socket at
    /// `/var/run/docker.sock`.
    #[cfg(unix)]
    #[must_use]
    pub fn platform_default() -> Self {
        Self::Unix(Utf8PathBuf::from(DEFAULT_SOCKET_PATH))
    }

    /// Returns the endpoint used when nothing is configured:
    /// `http://localhost:2375`.
    #[cfg(not(unix))]
    #[must_use]
    pub fn platform_default() -> Self {
        Self::Tcp {
            authority: String::from(DEFAULT_TCP_AUTHORITY),
        }
    }

    /// Parses an endpoint string.
    ///
    /// Supports the following formats:
    /// - Unix sockets: `unix:///path/to/socket`
    /// - Bare absolute paths: `/var/run/docker.sock`
    /// - TCP: `tcp://host:port` (spoken to as plain HTTP)
    /// - HTTP: `http://host:port`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for empty input, for schemes the
    /// adapter cannot speak (`npipe://`, `https://`, ...), for TCP endpoints
    /// without a host, and for socket paths on platforms without Unix
    /// domain sockets.
    pub fn parse(endpoint: &str) -> Result<Self, ConfigError> {
        let trimmed = endpoint.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: String::from("engine_socket"),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid(String::from("endpoint must not be empty")));
        }

        if let Some(rest) = trimmed
            .strip_prefix("tcp://")
            .or_else(|| trimmed.strip_prefix("http://"))
        {
            let authority = rest.trim_end_matches('/');
            if authority.is_empty() || authority.contains('/') {
                return Err(invalid(format!(
                    "expected host:port after the scheme, got '{endpoint}'"
                )));
            }
            return Ok(Self::Tcp {
                authority: authority.to_owned(),
            });
        }

        let path = match trimmed.split_once("://") {
            Some(("unix", path)) => path,
            Some((scheme, _)) => {
                return Err(invalid(format!("unsupported scheme '{scheme}'")));
            }
            None => trimmed,
        };

        #[cfg(unix)]
        {
            return Ok(Self::Unix(Utf8PathBuf::from(path)));
        }

        #[cfg(not(unix))]
        {
            Err(invalid(format!(
                "Unix domain sockets are not supported on this platform, got '{path}'"
            )))
        }
    }

    /// Returns the value sent in the `Host` header.
    ///
    /// Socket connections have no meaningful host, so `localhost` is used.
    #[must_use]
    pub fn host_header(&self) -> &str {
        match self {
            #[cfg(unix)]
            Self::Unix(_) => "localhost",
            Self::Tcp { authority } => authority,
        }
    }
}

impl fmt::Display for EngineEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "unix://{path}"),
            Self::Tcp { authority } => write!(f, "http://{authority}"),
        }
    }
}

/// Resolves engine endpoints from configuration and environment variables.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use dockbridge::engine::EndpointResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = EndpointResolver::new(&env);
/// let endpoint = resolver.resolve(None)?;
/// ```
pub struct EndpointResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> EndpointResolver<'a, E> {
    /// Creates a new resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Returns the first non-empty fallback environment variable.
    ///
    /// Checks `DOCKER_HOST`, `CONTAINER_HOST` and `PODMAN_HOST` in order.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Resolves the endpoint to use.
    ///
    /// Empty configured values are skipped, as are empty environment values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the selected endpoint string
    /// cannot be parsed.
    pub fn resolve(&self, configured: Option<&str>) -> Result<EngineEndpoint, ConfigError> {
        configured
            .filter(|value| !value.trim().is_empty())
            .map(String::from)
            .or_else(|| self.resolve_from_env())
            .map_or_else(
                || Ok(EngineEndpoint::platform_default()),
                |value| EngineEndpoint::parse(&value),
            )
    }
}
