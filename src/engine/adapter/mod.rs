//! The engine adapter: request dispatch over a transport plus the
//! per-instance negotiated API version.

mod negotiate;

use serde_json::Value;
use tracing::debug;

use super::name::extract_container_name;
use super::path::{QueryParameters, build_request_target};
use super::result::NormalizedResult;
use super::transport::{EngineRequest, EngineTransport};
use super::version::{ApiVersion, EngineVersion, VersionCell};

pub use negotiate::VERSION_PATH;

/// Adapter between abstract engine commands and versioned HTTP calls.
///
/// The adapter owns its negotiated [`EngineVersion`]. The version moves from
/// uninitialised to negotiated exactly once and is never cleared; every
/// dispatch reads whatever is in effect when its request target is built.
#[derive(Debug)]
pub struct EngineAdapter<T> {
    transport: T,
    version: VersionCell,
}

impl<T: EngineTransport> EngineAdapter<T> {
    /// Creates an adapter that has not negotiated a version yet.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            version: VersionCell::new(),
        }
    }

    /// Pins the API version before first use, skipping negotiation.
    #[must_use]
    pub fn with_api_version(self, version: ApiVersion) -> Self {
        self.set_api_version(version);
        self
    }

    /// Pins the API version if none is in effect yet.
    ///
    /// Returns `false` (and changes nothing) when a version was already
    /// negotiated or pinned.
    pub fn set_api_version(&self, version: ApiVersion) -> bool {
        self.version.set_if_unset(EngineVersion {
            api_version: version,
            min_api_version: None,
        })
    }

    /// Returns the API version in effect, if any.
    #[must_use]
    pub fn api_version(&self) -> Option<&ApiVersion> {
        self.version.api_version()
    }

    /// Returns the full version record, if any.
    #[must_use]
    pub fn engine_version(&self) -> Option<&EngineVersion> {
        self.version.get()
    }

    /// Executes one engine request and normalises its outcome.
    ///
    /// `path` must not carry a version prefix; the version in effect (if any)
    /// is prepended here. `method` is matched case-insensitively and sent
    /// upper-case. Every outcome, including transport failures, is returned
    /// as a [`NormalizedResult`].
    pub async fn dispatch(
        &self,
        method: &str,
        path: &str,
        parameters: Option<&QueryParameters>,
        body: Option<&Value>,
    ) -> NormalizedResult {
        let target = build_request_target(self.api_version(), path, parameters);
        self.dispatch_target(method, target, body).await
    }

    /// Executes a request against an already-built target.
    async fn dispatch_target(
        &self,
        method: &str,
        target: String,
        body: Option<&Value>,
    ) -> NormalizedResult {
        let payload = match body.map(serde_json::to_vec).transpose() {
            Ok(payload) => payload.unwrap_or_default(),
            Err(error) => {
                return NormalizedResult::failure(
                    super::result::STATUS_OPAQUE,
                    format!("failed to serialise request body: {error}"),
                );
            }
        };

        let name = extract_container_name(&target);
        let method = method.to_ascii_uppercase();
        debug!(
            method = %method,
            target = %target,
            content_length = payload.len(),
            "dispatching engine request"
        );

        let request = EngineRequest {
            method,
            target,
            payload,
        };

        match self.transport.send(request).await {
            Ok(response) => NormalizedResult::from_response(response, name),
            Err(error) => {
                debug!(%error, "engine request failed");
                NormalizedResult::from_transport_error(&error)
            }
        }
    }
}
