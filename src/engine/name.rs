//! Best-effort container identification from a dispatched request target.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

const CONTAINERS_SEGMENT: &str = "containers";

/// Derives the container name or ID a request target refers to.
///
/// Resolution order:
/// 1. the `name` query parameter, verbatim;
/// 2. `"all"` when an `all` query parameter is truthy (bulk listings);
/// 3. the segment following `containers` in the path, after an optional
///    `v<version>` prefix (a name or an ID, depending on the operation);
/// 4. the empty string.
///
/// The result is correlation metadata only and is never validated.
#[must_use]
pub fn extract_container_name(target: &str) -> String {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    if let Some(name) = query_value(query, "name") {
        return name.into_owned();
    }

    if query_value(query, "all").is_some_and(|value| is_truthy(&value)) {
        return String::from("all");
    }

    container_segment(path).map(String::from).unwrap_or_default()
}

/// Returns the decoded value of the first `key` parameter in `query`.
fn query_value<'a>(query: &'a str, key: &str) -> Option<Cow<'a, str>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(candidate, _)| percent_decode_str(candidate).decode_utf8_lossy() == key)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy())
}

fn is_truthy(value: &str) -> bool {
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Returns the path segment that follows `containers`.
fn container_segment(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();

    if segments.peek().is_some_and(|first| is_version_segment(first)) {
        segments.next();
    }

    match (segments.next(), segments.next()) {
        (Some(CONTAINERS_SEGMENT), Some(id)) => Some(id),
        _ => None,
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment.strip_prefix('v').is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.')
    })
}
