//! `dockbridge` application entry point.
//!
//! This binary bridges newline-delimited JSON commands to a container engine.
//! It uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/dockbridge/config.toml` or path from
//!    `DOCKBRIDGE_CONFIG_PATH`)
//! 3. Environment variables (`DOCKBRIDGE_*`)
//! 4. Command-line arguments
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`); stdout carries
//! only results.

use std::sync::Arc;

use clap::Parser;
use dockbridge::bus::{self, ChannelSink, InboundMessage};
use dockbridge::config::{AppConfig, Cli, Commands, RequestArgs, load_config};
use dockbridge::engine::{EndpointResolver, EngineAdapter, HttpTransport};
use dockbridge::error::{BusError, Result as DockbridgeResult};
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inbound messages buffered between the stdin reader and the dispatcher.
const MESSAGE_BUFFER: usize = 64;

/// Application entry point.
///
/// Loads configuration with layered precedence via `OrthoConfig`, then dispatches
/// to the appropriate subcommand handler.
#[tokio::main]
async fn main() -> EyreResult<()> {
    init_tracing();

    let cli = Cli::parse();
    let env = DefaultEnv::new();
    let config = load_config(&cli, &env).map_err(Report::from)?;

    run(&cli, &config, &env).await.map_err(Report::from)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Execute the CLI command, returning domain-specific errors.
async fn run(cli: &Cli, config: &AppConfig, env: &DefaultEnv) -> DockbridgeResult<()> {
    let adapter = build_adapter(config, env)?;

    match &cli.command {
        Commands::Serve => serve_stdio(Arc::new(adapter)).await,
        Commands::Request(args) => send_request(&adapter, args).await,
        Commands::Version => report_version(&adapter).await,
    }
}

/// Resolves the endpoint and builds an adapter, pinning the configured API
/// version when one is set.
fn build_adapter(
    config: &AppConfig,
    env: &DefaultEnv,
) -> DockbridgeResult<EngineAdapter<HttpTransport>> {
    let endpoint = EndpointResolver::new(env).resolve(config.engine_socket.as_deref())?;
    info!(%endpoint, "using container engine endpoint");

    let adapter = EngineAdapter::new(HttpTransport::new(endpoint));
    if let Some(version) = config.pinned_api_version()? {
        let pinned = adapter.set_api_version(version);
        debug!(pinned, "configured API version applied");
    }
    Ok(adapter)
}

/// Reads commands from stdin until EOF and writes replies to stdout.
async fn serve_stdio(adapter: Arc<EngineAdapter<HttpTransport>>) -> DockbridgeResult<()> {
    let (sink, mut replies) = ChannelSink::channel();
    let (sender, receiver) = mpsc::channel(MESSAGE_BUFFER);

    let server = tokio::spawn(bus::serve(adapter, receiver, Arc::new(sink)));
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = replies.recv().await {
            write_json_line(&mut stdout, &reply)
                .await
                .map_err(|e| BusError::DeliveryFailed {
                    event_name: reply.event.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok::<(), BusError>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BusError::ReadFailed {
            message: e.to_string(),
        })?
    {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => {
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            Err(error) => warn!(%error, "skipping undecodable inbound line"),
        }
    }
    drop(sender);

    server.await.map_err(|e| task_failed(&e))?;
    writer.await.map_err(|e| task_failed(&e))??;
    Ok(())
}

/// Dispatches one command built from the CLI and prints its result.
async fn send_request(
    adapter: &EngineAdapter<HttpTransport>,
    args: &RequestArgs,
) -> DockbridgeResult<()> {
    let command = args.to_command()?;
    if adapter.api_version().is_none() {
        let negotiated = adapter.negotiate().await;
        debug!(?negotiated, "negotiated before one-shot request");
    }

    let result = adapter.dispatch_command(&command).await;
    write_json_line(&mut tokio::io::stdout(), &result)
        .await
        .map_err(|e| stdout_failed("request", &e))?;
    Ok(())
}

/// Negotiates with the engine and prints the version in effect.
async fn report_version(adapter: &EngineAdapter<HttpTransport>) -> DockbridgeResult<()> {
    let in_effect = adapter.negotiate().await;
    let minimum = adapter
        .engine_version()
        .and_then(|version| version.min_api_version.as_ref());

    let report = json!({
        "apiVersion": in_effect.as_ref().map(ToString::to_string),
        "minApiVersion": minimum.map(ToString::to_string),
    });
    write_json_line(&mut tokio::io::stdout(), &report)
        .await
        .map_err(|e| stdout_failed("version", &e))?;
    Ok(())
}

async fn write_json_line<W, T>(out: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await
}

fn stdout_failed(event_name: &str, error: &std::io::Error) -> BusError {
    BusError::DeliveryFailed {
        event_name: event_name.to_owned(),
        message: error.to_string(),
    }
}

fn task_failed(error: &tokio::task::JoinError) -> BusError {
    BusError::TaskFailed {
        message: error.to_string(),
    }
}
