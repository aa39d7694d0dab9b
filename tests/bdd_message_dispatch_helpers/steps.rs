//! Given/when step definitions for message-dispatch behavioural scenarios.

use std::sync::{Arc, Mutex};

use dockbridge::bus::{ChannelSink, InboundMessage};
use dockbridge::engine::{EngineAdapter, EngineRequest, EngineResponse, EngineTransport, SendFuture};
use dockbridge::error::TransportError;
use mockall::mock;
use rstest_bdd_macros::{given, when};
use serde_json::{Value, json};

use super::state::{EngineBehaviour, MessageDispatchState, StepResult};

mock! {
    #[derive(Debug)]
    Transport {}

    impl EngineTransport for Transport {
        fn send(&self, request: EngineRequest) -> SendFuture<'_>;
    }
}

#[given("the engine API version is pinned to {version}")]
fn engine_api_version_pinned(message_dispatch_state: &MessageDispatchState, version: String) {
    message_dispatch_state.pinned_version.set(Some(version));
}

#[given("the engine API version has not been negotiated")]
fn engine_api_version_not_negotiated(message_dispatch_state: &MessageDispatchState) {
    message_dispatch_state.pinned_version.set(None);
}

#[given("the engine lists one container")]
fn engine_lists_one_container(message_dispatch_state: &MessageDispatchState) {
    message_dispatch_state
        .engine
        .set(EngineBehaviour::ListsContainers);
}

#[given("the engine refuses connections")]
fn engine_refuses_connections(message_dispatch_state: &MessageDispatchState) {
    message_dispatch_state
        .engine
        .set(EngineBehaviour::RefusesConnections);
}

#[given("the engine rejects requests with status {status} and message {message}")]
fn engine_rejects_requests(
    message_dispatch_state: &MessageDispatchState,
    status: u16,
    message: String,
) {
    message_dispatch_state
        .engine
        .set(EngineBehaviour::Rejects { status, message });
}

#[given("the message parameter {key} is {value}")]
fn message_parameter(message_dispatch_state: &MessageDispatchState, key: String, value: String) {
    let mut parameters = message_dispatch_state.parameters.get().unwrap_or_default();
    parameters.insert(key, value);
    message_dispatch_state.parameters.set(parameters);
}

#[when("a message {method} {path} with reply event {event} is handled")]
fn message_with_reply_event_handled(
    message_dispatch_state: &MessageDispatchState,
    method: String,
    path: String,
    event: String,
) -> StepResult<()> {
    let message = InboundMessage {
        method: Some(method),
        path: Some(path),
        parameters: message_parameters(message_dispatch_state),
        body: None,
        event_name: Some(event),
    };
    handle_message(message_dispatch_state, message)
}

#[when("a message {method} {path} without a reply event is handled")]
fn message_without_reply_event_handled(
    message_dispatch_state: &MessageDispatchState,
    method: String,
    path: String,
) -> StepResult<()> {
    let message = InboundMessage {
        method: Some(method),
        path: Some(path),
        parameters: message_parameters(message_dispatch_state),
        body: None,
        event_name: None,
    };
    handle_message(message_dispatch_state, message)
}

#[when("a message without a method is handled with reply event {event}")]
fn message_without_method_handled(
    message_dispatch_state: &MessageDispatchState,
    event: String,
) -> StepResult<()> {
    let message = InboundMessage {
        method: None,
        path: Some(String::from("/containers/json")),
        parameters: None,
        body: None,
        event_name: Some(event),
    };
    handle_message(message_dispatch_state, message)
}

fn message_parameters(
    message_dispatch_state: &MessageDispatchState,
) -> Option<std::collections::BTreeMap<String, Value>> {
    let parameters = message_dispatch_state.parameters.get().unwrap_or_default();
    if parameters.is_empty() {
        return None;
    }
    Some(
        parameters
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

/// Builds an adapter over a mocked transport, handles one message and
/// records what the engine saw and what was emitted.
fn handle_message(
    message_dispatch_state: &MessageDispatchState,
    message: InboundMessage,
) -> StepResult<()> {
    let behaviour = message_dispatch_state
        .engine
        .get()
        .ok_or_else(|| String::from("engine behaviour should be set"))?;
    let sent: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let transport = scripted_transport(behaviour, Arc::clone(&sent));

    let adapter = EngineAdapter::new(transport);
    if let Some(version) = message_dispatch_state.pinned_version.get().flatten() {
        let parsed = version
            .parse()
            .map_err(|e| format!("pinned version should parse: {e}"))?;
        if !adapter.set_api_version(parsed) {
            return Err(String::from("pinned version should be stored"));
        }
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to create runtime: {e}"))?;
    let (sink, mut receiver) = ChannelSink::channel();
    runtime.block_on(adapter.handle(message, &sink));
    drop(sink);

    let mut replies = Vec::new();
    while let Ok(reply) = receiver.try_recv() {
        replies.push(reply);
    }
    message_dispatch_state.replies.set(replies);

    let targets = sent
        .lock()
        .map_err(|_| String::from("target log lock poisoned"))?
        .clone();
    message_dispatch_state.sent_targets.set(targets);
    message_dispatch_state
        .version_in_effect
        .set(adapter.api_version().map(ToString::to_string));
    Ok(())
}

fn scripted_transport(behaviour: EngineBehaviour, sent: Arc<Mutex<Vec<String>>>) -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_send().returning(move |request| {
        let outcome = respond(&behaviour, &request);
        if let Ok(mut log) = sent.lock() {
            log.push(request.target);
        }
        Box::pin(async move { outcome })
    });
    transport
}

fn respond(
    behaviour: &EngineBehaviour,
    request: &EngineRequest,
) -> Result<EngineResponse, TransportError> {
    match behaviour {
        EngineBehaviour::RefusesConnections => Err(TransportError::Connect {
            endpoint: String::from("unix:///var/run/docker.sock"),
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ),
        }),
        EngineBehaviour::Rejects { status, message } => Ok(json_response(
            *status,
            "Not Found",
            &json!({ "message": message }),
        )),
        EngineBehaviour::ListsContainers if request.target == "/version" => Ok(json_response(
            200,
            "OK",
            &json!({ "Version": "24.0.7", "ApiVersion": "1.43", "MinAPIVersion": "1.12" }),
        )),
        EngineBehaviour::ListsContainers => Ok(json_response(
            200,
            "OK",
            &json!([{ "Id": "abc123", "Names": ["/web"] }]),
        )),
    }
}

fn json_response(status: u16, reason: &str, body: &Value) -> EngineResponse {
    EngineResponse {
        status,
        reason: String::from(reason),
        content_type: Some(String::from("application/json")),
        body: serde_json::to_vec(body).unwrap_or_default(),
    }
}
