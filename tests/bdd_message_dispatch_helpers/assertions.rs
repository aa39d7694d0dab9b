//! Then-step assertions for message-dispatch behavioural scenarios.

use dockbridge::bus::Reply;
use rstest_bdd_macros::then;

use super::state::{MessageDispatchState, StepResult};

fn sent_targets(message_dispatch_state: &MessageDispatchState) -> StepResult<Vec<String>> {
    message_dispatch_state
        .sent_targets
        .get()
        .ok_or_else(|| String::from("sent targets should be recorded"))
}

fn only_reply(message_dispatch_state: &MessageDispatchState) -> StepResult<Reply> {
    let replies = message_dispatch_state
        .replies
        .get()
        .ok_or_else(|| String::from("replies should be recorded"))?;
    match replies.as_slice() {
        [reply] => Ok(reply.clone()),
        other => Err(format!("expected exactly one reply, got {}", other.len())),
    }
}

#[then("the engine receives {target}")]
fn engine_receives(
    message_dispatch_state: &MessageDispatchState,
    target: String,
) -> StepResult<()> {
    let targets = sent_targets(message_dispatch_state)?;
    if targets.contains(&target) {
        return Ok(());
    }
    Err(format!("expected engine to receive {target}, got {targets:?}"))
}

#[then("the engine is not contacted")]
fn engine_receives_no_request(message_dispatch_state: &MessageDispatchState) -> StepResult<()> {
    let targets = sent_targets(message_dispatch_state)?;
    if targets.is_empty() {
        return Ok(());
    }
    Err(format!("expected no engine requests, got {targets:?}"))
}

#[then("a reply {event} is emitted with status {status}")]
fn reply_emitted_with_status(
    message_dispatch_state: &MessageDispatchState,
    event: String,
    status: u16,
) -> StepResult<()> {
    let reply = only_reply(message_dispatch_state)?;
    if reply.event != event {
        return Err(format!("expected reply event {event}, got {}", reply.event));
    }
    if reply.payload.status != status {
        return Err(format!(
            "expected status {status}, got {}",
            reply.payload.status
        ));
    }
    Ok(())
}

#[then("no reply is emitted")]
fn no_reply_emitted(message_dispatch_state: &MessageDispatchState) -> StepResult<()> {
    let replies = message_dispatch_state
        .replies
        .get()
        .ok_or_else(|| String::from("replies should be recorded"))?;
    if replies.is_empty() {
        return Ok(());
    }
    Err(format!("expected no replies, got {}", replies.len()))
}

#[then("the reply has no container name")]
fn reply_name_is_empty(message_dispatch_state: &MessageDispatchState) -> StepResult<()> {
    let reply = only_reply(message_dispatch_state)?;
    if reply.payload.name.is_empty() {
        return Ok(());
    }
    Err(format!("expected empty name, got {}", reply.payload.name))
}

#[then("the reply name is {name}")]
fn reply_name_is(message_dispatch_state: &MessageDispatchState, name: String) -> StepResult<()> {
    let reply = only_reply(message_dispatch_state)?;
    if reply.payload.name == name {
        return Ok(());
    }
    Err(format!("expected name {name}, got {}", reply.payload.name))
}

#[then("the reply message is {message}")]
fn reply_message_is(
    message_dispatch_state: &MessageDispatchState,
    message: String,
) -> StepResult<()> {
    let reply = only_reply(message_dispatch_state)?;
    if reply.payload.message == message {
        return Ok(());
    }
    Err(format!(
        "expected message {message}, got {}",
        reply.payload.message
    ))
}

#[then("the reply data is null")]
fn reply_data_is_null(message_dispatch_state: &MessageDispatchState) -> StepResult<()> {
    let reply = only_reply(message_dispatch_state)?;
    match reply.payload.data {
        None => Ok(()),
        Some(data) => Err(format!("expected null data, got {data}")),
    }
}

#[then("the adapter uses API version {version}")]
fn adapter_uses_api_version(
    message_dispatch_state: &MessageDispatchState,
    version: String,
) -> StepResult<()> {
    let in_effect = message_dispatch_state.version_in_effect.get().flatten();
    if in_effect.as_deref() == Some(version.as_str()) {
        return Ok(());
    }
    Err(format!("expected API version {version}, got {in_effect:?}"))
}
