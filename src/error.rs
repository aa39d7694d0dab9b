//! Semantic error types for the dockbridge application.
//!
//! This module defines the error hierarchy for dockbridge, following the
//! principle of using semantic error enums (via `thiserror`) for conditions the
//! caller might inspect or map to a status code, while reserving opaque errors
//! (`eyre::Report`) for the application boundary.
//!
//! Transport failures never escape the request dispatcher: they are
//! classified and folded into a [`crate::engine::NormalizedResult`], so
//! [`TransportError`] is not part of [`DockbridgeError`].

use std::io::ErrorKind;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    ///
    /// This wraps errors from the layered configuration system, including:
    /// - Configuration file parsing errors
    /// - Environment variable parsing errors
    /// - CLI argument parsing errors
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised by an engine transport while performing one HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The engine endpoint could not be dialled.
    #[error("failed to connect to container engine at {endpoint}: {source}")]
    Connect {
        /// The endpoint that was dialled.
        endpoint: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The request could not be assembled (bad method, bad target).
    #[error("invalid engine request: {message}")]
    InvalidRequest {
        /// A description of the problem.
        message: String,
    },

    /// The connection was established but the HTTP exchange failed.
    #[error("{message}")]
    Exchange {
        /// The text reported by the HTTP layer.
        message: String,
        /// The I/O error kind found in the failure's source chain, if any.
        io_kind: Option<ErrorKind>,
    },

    /// The exchange failed without any usable description.
    #[error("container engine request failed without detail")]
    Opaque,
}

impl TransportError {
    /// Returns the I/O error kind behind this failure, if one is known.
    #[must_use]
    pub fn io_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Connect { source, .. } => Some(source.kind()),
            Self::Exchange { io_kind, .. } => *io_kind,
            Self::InvalidRequest { .. } | Self::Opaque => None,
        }
    }
}

/// Errors raised by the bus-facing front ends (stdio bridge, CLI).
#[derive(Debug, Error)]
pub enum BusError {
    /// Inbound messages could not be read.
    #[error("failed to read inbound messages: {message}")]
    ReadFailed {
        /// A description of the read failure.
        message: String,
    },

    /// A reply could not be delivered.
    #[error("failed to deliver reply '{event_name}': {message}")]
    DeliveryFailed {
        /// The reply event name.
        event_name: String,
        /// A description of the delivery failure.
        message: String,
    },

    /// An inbound message lacked a required field.
    #[error("inbound command is missing '{field}'")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A background serving task panicked or was cancelled.
    #[error("serving task failed: {message}")]
    TaskFailed {
        /// A description of the failure.
        message: String,
    },

    /// A command supplied on the command line was not valid.
    #[error("invalid command: {message}")]
    InvalidCommand {
        /// A description of the problem.
        message: String,
    },
}

/// Top-level error type for the dockbridge application.
///
/// This enum aggregates all domain-specific errors into a single type that can
/// be used throughout the application. At the application boundary (main.rs),
/// these errors are converted to `eyre::Report` for human-readable reporting.
#[derive(Debug, Error)]
pub enum DockbridgeError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred on the bus side.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// A specialised `Result` type for dockbridge operations.
pub type Result<T> = std::result::Result<T, DockbridgeError>;
