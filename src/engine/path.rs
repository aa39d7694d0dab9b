//! Request-target construction for the engine API.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::version::ApiVersion;

/// Bytes left unescaped in query keys and values.
///
/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is percent-encoded.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Query parameters attached to an engine request, in canonical key order.
pub type QueryParameters = BTreeMap<String, String>;

/// Builds the request target for an engine call.
///
/// With a known `version` the path is prefixed with `/v<version>`; without one
/// it is passed through unchanged (this is how `/version` itself is reached).
/// Non-empty `parameters` are appended as a percent-encoded query string.
///
/// # Example
///
/// ```
/// use dockbridge::engine::{ApiVersion, QueryParameters, build_request_target};
///
/// let version: ApiVersion = "1.41".parse().expect("valid version");
/// let mut parameters = QueryParameters::new();
/// parameters.insert(String::from("all"), String::from("true"));
///
/// assert_eq!(
///     build_request_target(Some(&version), "/containers/json", Some(&parameters)),
///     "/v1.41/containers/json?all=true"
/// );
/// ```
#[must_use]
pub fn build_request_target(
    version: Option<&ApiVersion>,
    path: &str,
    parameters: Option<&QueryParameters>,
) -> String {
    let mut target = version.map_or_else(String::new, |v| format!("/v{v}"));
    target.push_str(path);

    if let Some(query) = parameters.filter(|p| !p.is_empty()).map(encode_query) {
        target.push('?');
        target.push_str(&query);
    }

    target
}

/// Encodes `parameters` as `key=value&...` with percent-escaped components.
fn encode_query(parameters: &QueryParameters) -> String {
    parameters
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
