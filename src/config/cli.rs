//! Command-line argument definitions for dockbridge.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::bus::Command;
use crate::engine::QueryParameters;
use crate::error::BusError;

/// Command-line interface for dockbridge.
#[derive(Debug, Parser)]
#[command(name = "dockbridge")]
#[command(
    author,
    version,
    about = "Bridge event-bus commands to a container engine's HTTP API"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Engine API version to use instead of negotiating.
    #[arg(long, global = true)]
    pub api_version: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read newline-delimited JSON commands from stdin and write replies to
    /// stdout.
    Serve,

    /// Send a single request to the engine and print the result.
    Request(RequestArgs),

    /// Negotiate with the engine and print the API version in effect.
    Version,
}

/// Arguments for the `request` subcommand.
#[derive(Debug, Parser)]
pub struct RequestArgs {
    /// HTTP method.
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Resource path without a version prefix, e.g. `/containers/json`.
    #[arg(long, required = true)]
    pub path: String,

    /// Query parameter as `key=value`; may be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,
}

impl RequestArgs {
    /// Converts the arguments into an engine command with no reply event.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidCommand` when a `--param` lacks `=` or the
    /// body is not valid JSON, and `BusError::MissingField` when the method
    /// or path is empty.
    pub fn to_command(&self) -> Result<Command, BusError> {
        let parameters = if self.params.is_empty() {
            None
        } else {
            Some(
                self.params
                    .iter()
                    .map(|pair| parse_param(pair))
                    .collect::<Result<QueryParameters, _>>()?,
            )
        };

        let body = self
            .body
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| BusError::InvalidCommand {
                message: format!("--body is not valid JSON: {e}"),
            })?;

        if self.method.is_empty() {
            return Err(BusError::MissingField { field: "method" });
        }
        if self.path.is_empty() {
            return Err(BusError::MissingField { field: "path" });
        }

        Ok(Command {
            method: self.method.to_uppercase(),
            path: self.path.clone(),
            parameters,
            body,
            event_name: None,
        })
    }
}

fn parse_param(pair: &str) -> Result<(String, String), BusError> {
    let (key, value) = pair.split_once('=').ok_or_else(|| BusError::InvalidCommand {
        message: format!("--param expects KEY=VALUE, got '{pair}'"),
    })?;
    if key.is_empty() {
        return Err(BusError::InvalidCommand {
            message: format!("--param has an empty key in '{pair}'"),
        });
    }
    Ok((key.to_owned(), value.to_owned()))
}
