//! HTTP/1.1 exchanges with the engine over a Unix socket or TCP.
//!
//! The [`EngineTransport`] trait is the seam between request dispatch and the
//! network, so dispatch behaviour can be unit-tested without a live daemon.
//! [`HttpTransport`] is the production implementation: it opens one
//! connection per request, performs a single exchange and closes it.

mod error_classification;

use std::future::Future;
use std::pin::Pin;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tracing::debug;

use self::error_classification::exchange_error;
use super::endpoint::EngineEndpoint;
use crate::error::TransportError;

/// Media type used for every request body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A fully prepared engine request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Upper-case HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Origin-form request target, including any version prefix and query.
    pub target: String,
    /// Serialised JSON payload; empty when the command had no body.
    pub payload: Vec<u8>,
}

impl EngineRequest {
    /// Returns the `Content-Length` value for this request.
    #[must_use]
    pub const fn content_length(&self) -> usize {
        self.payload.len()
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResponse {
    /// Status code reported by the engine.
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    /// The `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Boxed future type returned by [`EngineTransport::send`].
pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<EngineResponse, TransportError>> + Send + 'a>>;

/// Behaviour required to perform one HTTP exchange with the engine.
pub trait EngineTransport {
    /// Sends `request` and collects the whole response.
    fn send(&self, request: EngineRequest) -> SendFuture<'_>;
}

/// Hyper-backed transport dialling the configured [`EngineEndpoint`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: EngineEndpoint,
}

impl HttpTransport {
    /// Creates a transport for `endpoint`.
    #[must_use]
    pub const fn new(endpoint: EngineEndpoint) -> Self {
        Self { endpoint }
    }

    async fn exchange(&self, request: EngineRequest) -> Result<EngineResponse, TransportError> {
        let prepared = self.build_request(request)?;

        match &self.endpoint {
            #[cfg(unix)]
            EngineEndpoint::Unix(path) => {
                let stream = UnixStream::connect(path.as_std_path())
                    .await
                    .map_err(|source| self.connect_error(source))?;
                send_over(stream, prepared).await
            }
            EngineEndpoint::Tcp { authority } => {
                let stream = TcpStream::connect(authority.as_str())
                    .await
                    .map_err(|source| self.connect_error(source))?;
                send_over(stream, prepared).await
            }
        }
    }

    fn build_request(
        &self,
        request: EngineRequest,
    ) -> Result<Request<Full<Bytes>>, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::InvalidRequest {
                message: format!("invalid method '{}': {e}", request.method),
            }
        })?;
        let content_length = request.content_length();

        Request::builder()
            .method(method)
            .uri(request.target.as_str())
            .header(HOST, self.endpoint.host_header())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(CONTENT_LENGTH, content_length)
            .body(Full::new(Bytes::from(request.payload)))
            .map_err(|e| TransportError::InvalidRequest {
                message: format!("invalid request target '{}': {e}", request.target),
            })
    }

    fn connect_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

impl EngineTransport for HttpTransport {
    fn send(&self, request: EngineRequest) -> SendFuture<'_> {
        Box::pin(self.exchange(request))
    }
}

/// Performs one HTTP/1.1 exchange over an established stream.
async fn send_over<S>(
    stream: S,
    request: Request<Full<Bytes>>,
) -> Result<EngineResponse, TransportError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| exchange_error(&e))?;

    tokio::spawn(async move {
        if let Err(error) = connection.await {
            debug!(%error, "engine connection closed with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| exchange_error(&e))?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| exchange_error(&e))?
        .to_bytes();

    Ok(EngineResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_owned(),
        content_type,
        body: body.to_vec(),
    })
}
