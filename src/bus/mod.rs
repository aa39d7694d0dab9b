//! Bus-facing message handling.
//!
//! Inbound messages describe an engine call (`method`, `path`, optional
//! `parameters` and `body`) and optionally name a reply event. Valid messages
//! are dispatched through an [`EngineAdapter`]; the [`NormalizedResult`] is
//! delivered to a [`ReplySink`] under the reply event name, or discarded when
//! the message named none.
//!
//! ```json
//! {
//!   "method": "GET",
//!   "path": "/containers/json",
//!   "parameters": { "all": "true" },
//!   "eventName": "list-reply"
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::engine::{EngineAdapter, EngineTransport, NormalizedResult, QueryParameters};
use crate::error::BusError;

/// A message as it arrives from the bus, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// HTTP method to use.
    #[serde(default)]
    pub method: Option<String>,
    /// Resource path without a version prefix, e.g. `/containers/json`.
    #[serde(default)]
    pub path: Option<String>,
    /// Query parameters. Non-string scalars are sent in their JSON text form.
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, Value>>,
    /// JSON request body.
    #[serde(default)]
    pub body: Option<Value>,
    /// Event name to deliver the result under; absent means no reply.
    #[serde(default)]
    pub event_name: Option<String>,
}

/// A validated engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// HTTP method to use.
    pub method: String,
    /// Resource path without a version prefix.
    pub path: String,
    /// Query parameters, if any.
    pub parameters: Option<QueryParameters>,
    /// JSON request body, if any.
    pub body: Option<Value>,
    /// Reply event name, if any.
    pub event_name: Option<String>,
}

impl TryFrom<InboundMessage> for Command {
    type Error = BusError;

    fn try_from(message: InboundMessage) -> Result<Self, Self::Error> {
        let method = non_empty(message.method).ok_or(BusError::MissingField { field: "method" })?;
        let path = non_empty(message.path).ok_or(BusError::MissingField { field: "path" })?;

        Ok(Self {
            method,
            path,
            parameters: message.parameters.map(|parameters| {
                parameters
                    .into_iter()
                    .map(|(key, value)| (key, parameter_text(value)))
                    .collect()
            }),
            body: message.body,
            event_name: non_empty(message.event_name),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

fn parameter_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Destination for normalised results.
///
/// Implementors decide what "emitting an event" means: publishing on a bus
/// topic, pushing onto a channel, or completing a continuation.
pub trait ReplySink: Send + Sync {
    /// Delivers `result` under `event_name`.
    fn emit(&self, event_name: &str, result: &NormalizedResult);
}

impl<F> ReplySink for F
where
    F: Fn(&str, &NormalizedResult) + Send + Sync,
{
    fn emit(&self, event_name: &str, result: &NormalizedResult) {
        self(event_name, result);
    }
}

/// A result delivered under a reply event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// The reply event name taken from the inbound message.
    pub event: String,
    /// The normalised result.
    pub payload: NormalizedResult,
}

/// A [`ReplySink`] that forwards replies onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Reply>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its replies arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ReplySink for ChannelSink {
    fn emit(&self, event_name: &str, result: &NormalizedResult) {
        let reply = Reply {
            event: event_name.to_owned(),
            payload: result.clone(),
        };
        if self.sender.send(reply).is_err() {
            warn!(event = event_name, "reply receiver dropped; discarding result");
        }
    }
}

impl<T: EngineTransport + Sync> EngineAdapter<T> {
    /// Handles one inbound message.
    ///
    /// When no API version is in effect, negotiation starts alongside the
    /// dispatch rather than ahead of it, so a command handled before
    /// negotiation completes is sent unversioned. Messages lacking `method`
    /// or `path` are dropped without a reply.
    pub async fn handle<S>(&self, message: InboundMessage, sink: &S)
    where
        S: ReplySink + ?Sized,
    {
        debug!(?message, "received command");
        let needs_version = self.api_version().is_none();

        let negotiation = async {
            if needs_version && let Some(version) = self.negotiate().await {
                debug!(%version, "engine API version in effect");
            }
        };

        let request = async {
            match Command::try_from(message) {
                Ok(command) => {
                    let result = self.dispatch_command(&command).await;
                    if let Some(event_name) = command.event_name.as_deref() {
                        sink.emit(event_name, &result);
                    }
                }
                Err(error) => debug!(%error, "dropping malformed command"),
            }
        };

        tokio::join!(negotiation, request);
    }

    /// Dispatches a validated command.
    pub async fn dispatch_command(&self, command: &Command) -> NormalizedResult {
        self.dispatch(
            &command.method,
            &command.path,
            command.parameters.as_ref(),
            command.body.as_ref(),
        )
        .await
    }
}

/// Handles every message from `messages` concurrently until the channel
/// closes, then waits for in-flight commands to finish.
///
/// Completions are delivered in whatever order the engine answers.
pub async fn serve<T, S>(
    adapter: Arc<EngineAdapter<T>>,
    mut messages: mpsc::Receiver<InboundMessage>,
    sink: Arc<S>,
) where
    T: EngineTransport + Send + Sync + 'static,
    S: ReplySink + ?Sized + 'static,
{
    let mut in_flight = JoinSet::new();

    while let Some(message) = messages.recv().await {
        let task_adapter = Arc::clone(&adapter);
        let task_sink = Arc::clone(&sink);
        in_flight.spawn(async move { task_adapter.handle(message, task_sink.as_ref()).await });

        while let Some(finished) = in_flight.try_join_next() {
            log_join_failure(&finished);
        }
    }

    while let Some(finished) = in_flight.join_next().await {
        log_join_failure(&finished);
    }
}

fn log_join_failure(finished: &Result<(), JoinError>) {
    if let Err(error) = finished {
        warn!(%error, "command task failed");
    }
}
