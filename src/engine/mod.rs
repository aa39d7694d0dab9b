//! Container engine API access.
//!
//! This module turns abstract engine commands into versioned HTTP calls
//! against the Docker or Podman management API and folds every outcome into
//! a [`NormalizedResult`]. The pieces, leaves first:
//!
//! - [`EngineEndpoint`] / [`EndpointResolver`]: where the engine listens
//! - [`build_request_target`]: `/v<version><path>?<query>` construction
//! - [`EngineTransport`] / [`HttpTransport`]: one HTTP/1.1 exchange
//! - [`EngineAdapter`]: version negotiation and request dispatch
//! - [`extract_container_name`]: correlation of results to containers

mod adapter;
mod endpoint;
mod name;
mod path;
mod result;
mod transport;
mod version;

pub use adapter::{EngineAdapter, VERSION_PATH};
pub use endpoint::{DEFAULT_SOCKET_PATH, DEFAULT_TCP_AUTHORITY, EndpointResolver, EngineEndpoint};
pub use name::extract_container_name;
pub use path::{QueryParameters, build_request_target};
pub use result::{
    FailureKind, NormalizedResult, STATUS_OPAQUE, STATUS_UNREACHABLE, UNKNOWN_SERVER_ERROR,
};
pub use transport::{
    EngineRequest, EngineResponse, EngineTransport, HttpTransport, JSON_CONTENT_TYPE, SendFuture,
};
pub use version::{ApiVersion, EngineVersion, VersionCell};
