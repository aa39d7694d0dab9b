//! One-time discovery of the engine's API version.

use bollard::models::SystemVersion;
use tracing::{info, warn};

use super::EngineAdapter;
use crate::engine::path::build_request_target;
use crate::engine::transport::EngineTransport;
use crate::engine::version::{ApiVersion, EngineVersion};

/// The only unversioned path the adapter calls.
pub const VERSION_PATH: &str = "/version";

impl<T: EngineTransport> EngineAdapter<T> {
    /// Discovers the engine's API version via `GET /version`.
    ///
    /// On success the reported `ApiVersion` is stored unless a version is
    /// already in effect; an existing version is never overwritten. When the
    /// engine also reports `MinAPIVersion` and the version in effect is older,
    /// a warning is logged and the adapter stays usable.
    ///
    /// Failures (transport errors, error statuses, malformed reports) are
    /// logged and leave the version untouched so a later call can retry.
    ///
    /// Returns the API version in effect after the attempt.
    pub async fn negotiate(&self) -> Option<ApiVersion> {
        let target = build_request_target(None, VERSION_PATH, None);
        let result = self.dispatch_target("GET", target, None).await;

        if !result.is_success() {
            warn!(
                status = result.status,
                kind = ?result.failure_kind(),
                message = %result.message,
                "failed to get engine version info"
            );
            return self.api_version().cloned();
        }

        let report = match result
            .data
            .map(serde_json::from_value::<SystemVersion>)
            .transpose()
        {
            Ok(Some(report)) => report,
            Ok(None) => {
                warn!("engine version info was empty");
                return self.api_version().cloned();
            }
            Err(error) => {
                warn!(%error, "engine version info was malformed");
                return self.api_version().cloned();
            }
        };

        let Some(api_version) = parse_reported(report.api_version.as_deref(), "ApiVersion") else {
            warn!("engine version info has no usable ApiVersion");
            return self.api_version().cloned();
        };
        let min_api_version = parse_reported(report.min_api_version.as_deref(), "MinAPIVersion");

        let stored = self.version.set_if_unset(EngineVersion {
            api_version: api_version.clone(),
            min_api_version: min_api_version.clone(),
        });
        if stored {
            info!(
                engine_version = report.version.as_deref().unwrap_or("unknown"),
                api_version = %api_version,
                "negotiated engine API version"
            );
        }

        let in_effect = self.api_version().cloned();
        if let (Some(current), Some(minimum)) = (in_effect.as_ref(), min_api_version.as_ref())
            && current < minimum
        {
            warn!(
                api_version = %current,
                min_api_version = %minimum,
                "API version in effect is below the engine's minimum supported version"
            );
        }
        in_effect
    }
}

/// Parses a version field from the engine's report, logging bad values.
fn parse_reported(value: Option<&str>, field: &str) -> Option<ApiVersion> {
    value?
        .parse::<ApiVersion>()
        .map_err(|error| warn!(field, %error, "engine reported an unusable version"))
        .ok()
}
