//! Bridge between an event bus and a container engine's HTTP API.
//!
//! `dockbridge` accepts abstract engine commands (an HTTP method, a resource
//! path, optional query parameters and an optional JSON body), turns each one
//! into a versioned request against the Docker or Podman management API, and
//! folds every outcome, success or failure, into a uniform
//! [`engine::NormalizedResult`]. When the inbound message names a reply event,
//! the result is emitted back under that name.
//!
//! # Architecture
//!
//! The engine is reached over a Unix domain socket or plain TCP. On first use
//! the adapter asks the engine for its API version and pins every later
//! request to it. Failures never surface as errors to the bus; a refused
//! connection becomes a `503` result and an engine error status is passed
//! through with the engine's own message.
//!
//! # Modules
//!
//! - [`bus`]: Inbound message validation, reply sinks and the serving loop
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Endpoint resolution, request construction, transport and negotiation
//! - [`error`]: Semantic error types for the application

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
