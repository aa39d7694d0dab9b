//! Engine API version identifiers and the per-adapter version cell.
//!
//! Engine API versions are dotted identifiers such as `1.41`. They are
//! compared segment by segment as integers, so `1.9 < 1.41`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ConfigError;

/// A dotted engine API version such as `1.41`.
///
/// Equality and ordering use the integer segments; trailing zero segments are
/// insignificant, so `1.41` and `1.41.0` compare equal.
#[derive(Debug, Clone)]
pub struct ApiVersion {
    raw: String,
    segments: Vec<u64>,
}

impl ApiVersion {
    /// Returns the version exactly as it appears in request paths.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let invalid = || ConfigError::InvalidValue {
            field: String::from("api_version"),
            reason: format!("expected a dotted version such as 1.41, got '{text}'"),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let segments = trimmed
            .split('.')
            .map(|segment| segment.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: trimmed.to_owned(),
            segments,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.segments.len().max(other.segments.len());
        (0..width)
            .map(|index| {
                let left = self.segments.get(index).copied().unwrap_or(0);
                let right = other.segments.get(index).copied().unwrap_or(0);
                left.cmp(&right)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// The negotiated engine version record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    /// The API version used to prefix request paths.
    pub api_version: ApiVersion,
    /// The oldest API version the engine accepts, when it reported one.
    pub min_api_version: Option<ApiVersion>,
}

/// Write-once holder for the adapter's [`EngineVersion`].
///
/// The cell starts uninitialised and is populated at most once, either by an
/// explicit override before first use or by the first successful negotiation.
/// Later writes are ignored.
#[derive(Debug, Default)]
pub struct VersionCell {
    inner: OnceLock<EngineVersion>,
}

impl VersionCell {
    /// Creates an uninitialised cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Returns the stored version record, if any.
    #[must_use]
    pub fn get(&self) -> Option<&EngineVersion> {
        self.inner.get()
    }

    /// Returns the stored API version, if any.
    #[must_use]
    pub fn api_version(&self) -> Option<&ApiVersion> {
        self.get().map(|version| &version.api_version)
    }

    /// Stores `version` if the cell is still empty.
    ///
    /// Returns `true` when this call populated the cell.
    pub fn set_if_unset(&self, version: EngineVersion) -> bool {
        self.inner.set(version).is_ok()
    }
}
