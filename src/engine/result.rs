//! The canonical outcome of every dispatched engine request.
//!
//! Every exchange, successful or not, is folded into a [`NormalizedResult`].
//! Transport failures are classified by [`FailureKind`]:
//!
//! | Kind          | Status              | Message                           |
//! |---------------|---------------------|-----------------------------------|
//! | `Unreachable` | 503                 | system error text                 |
//! | `Engine`      | engine-reported     | engine `message`, or reason text  |
//! | `Opaque`      | 502                 | error text or "unknown server error" |

use std::io::ErrorKind;

use bollard::models::ErrorResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::transport::EngineResponse;
use crate::error::TransportError;

/// Status reported when the engine socket or endpoint cannot be reached.
pub const STATUS_UNREACHABLE: u16 = 503;

/// Status reported when a failure carries no structured engine response.
pub const STATUS_OPAQUE: u16 = 502;

/// Message used when a failure carries no usable description.
pub const UNKNOWN_SERVER_ERROR: &str = "unknown server error";

/// How a dispatched request failed, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine is not running or access to it was denied.
    Unreachable,
    /// The engine answered with an HTTP error status.
    Engine,
    /// The failure carried no structured engine response.
    Opaque,
}

impl FailureKind {
    /// Classifies a transport failure.
    #[must_use]
    pub fn classify(error: &TransportError) -> Self {
        match error.io_kind() {
            Some(
                ErrorKind::ConnectionRefused | ErrorKind::PermissionDenied | ErrorKind::NotFound,
            ) => Self::Unreachable,
            _ => Self::Opaque,
        }
    }
}

/// The single success/failure shape handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// HTTP-style status code.
    pub status: u16,
    /// Reason phrase on success, error description on failure.
    pub message: String,
    /// Decoded response body, `null` when there was none.
    pub data: Option<Value>,
    /// Best-effort container name or ID the request referred to.
    pub name: String,
}

impl NormalizedResult {
    /// Builds a result from a completed HTTP exchange.
    ///
    /// Error statuses (400 and above) take their message from the engine's
    /// `{"message": ...}` error body, falling back to the reason phrase.
    #[must_use]
    pub fn from_response(response: EngineResponse, name: String) -> Self {
        let data = decode_body(&response.body, response.content_type.as_deref());
        let message = if response.status >= 400 {
            engine_error_message(data.as_ref()).unwrap_or(response.reason)
        } else {
            response.reason
        };

        Self {
            status: response.status,
            message,
            data,
            name,
        }
    }

    /// Builds a result from a transport failure.
    #[must_use]
    pub fn from_transport_error(error: &TransportError) -> Self {
        match FailureKind::classify(error) {
            FailureKind::Unreachable => Self::failure(STATUS_UNREACHABLE, error.to_string()),
            FailureKind::Engine | FailureKind::Opaque => Self::opaque(error),
        }
    }

    fn opaque(error: &TransportError) -> Self {
        let text = error.to_string();
        let message = if matches!(error, TransportError::Opaque) || text.trim().is_empty() {
            String::from(UNKNOWN_SERVER_ERROR)
        } else {
            text
        };
        Self::failure(STATUS_OPAQUE, message)
    }

    /// Builds a failure result with no data and no name.
    #[must_use]
    pub const fn failure(status: u16, message: String) -> Self {
        Self {
            status,
            message,
            data: None,
            name: String::new(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Classifies this result; `None` means the request succeeded.
    pub(crate) fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            0..400 => None,
            STATUS_UNREACHABLE if self.data.is_none() && self.name.is_empty() => {
                Some(FailureKind::Unreachable)
            }
            STATUS_OPAQUE if self.data.is_none() && self.name.is_empty() => {
                Some(FailureKind::Opaque)
            }
            _ => Some(FailureKind::Engine),
        }
    }
}

/// Extracts the engine's error message from a decoded error body.
fn engine_error_message(data: Option<&Value>) -> Option<String> {
    data.cloned()
        .and_then(|value| serde_json::from_value::<ErrorResponse>(value).ok())
        .map(|error| error.message)
        .filter(|message| !message.is_empty())
}

fn is_json_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type.ends_with("/json")
        || media_type.ends_with("+json")
        || media_type.contains("json-stream")
}

/// Decodes a response body.
///
/// A body that is one JSON document decodes to that document. A JSON-typed
/// body that is not is treated as newline-delimited JSON: every line decodes
/// on its own and undecodable lines are logged and dropped. Several decoded
/// lines form an array. Anything else decodes to `None`.
fn decode_body(body: &[u8], content_type: Option<&str>) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return Some(value);
    }

    if !content_type.is_some_and(is_json_media_type) {
        debug!(
            content_type = content_type.unwrap_or("none"),
            bytes = body.len(),
            "engine response body is not JSON"
        );
        return None;
    }

    let text = String::from_utf8_lossy(body);
    let mut values: Vec<Value> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%error, "error parsing engine response chunk");
                None
            }
        })
        .collect();

    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Array(values)),
    }
}
