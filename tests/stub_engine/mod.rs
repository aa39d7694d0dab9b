//! A minimal HTTP/1.1 engine stand-in for end-to-end transport tests.
//!
//! Each accepted connection is served by hyper's HTTP/1 server. Every request
//! is recorded and answered with a canned response chosen by the request
//! target.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::task::JoinHandle;

/// A request as seen by the stub engine.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Request method.
    pub method: String,
    /// Request target (path and query).
    pub target: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Returns the header value with the given name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    async fn from_request(request: Request<Incoming>) -> Self {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes().to_vec())
            .unwrap_or_default();

        Self {
            method: parts.method.to_string(),
            target: parts
                .uri
                .path_and_query()
                .map(ToString::to_string)
                .unwrap_or_default(),
            headers: parts.headers,
            body,
        }
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    /// Response status.
    pub status: StatusCode,
    /// Content type, if any.
    pub content_type: Option<&'static str>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl CannedResponse {
    /// A JSON response with the given status.
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: serde_json::to_vec(body).expect("canned body should serialise"),
        }
    }

    /// A response with a raw body.
    pub fn raw(status: StatusCode, content_type: Option<&'static str>, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.as_bytes().to_vec(),
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut builder = Response::builder().status(self.status);
        if let Some(content_type) = self.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder
            .body(Full::new(Bytes::from(self.body)))
            .expect("canned response should build")
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> CannedResponse + Send + Sync>;

/// Requests recorded by a running stub.
pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// A stub engine listening on a Unix socket inside a temporary directory.
pub struct UnixStubEngine {
    _dir: TempDir,
    /// The socket path.
    pub socket: Utf8PathBuf,
    /// Requests received so far.
    pub recorded: Recorded,
    _task: JoinHandle<()>,
}

impl UnixStubEngine {
    /// Binds a stub engine; must be called inside a tokio runtime.
    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
    {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let socket = Utf8PathBuf::try_from(dir.path().join("engine.sock"))
            .expect("socket path should be UTF-8");
        let listener = UnixListener::bind(&socket).expect("stub socket should bind");
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(respond);
        let log = Arc::clone(&recorded);

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&responder), Arc::clone(&log)));
            }
        });

        Self {
            _dir: dir,
            socket,
            recorded,
            _task: task,
        }
    }

    /// Returns a copy of every recorded request.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded
            .lock()
            .expect("record lock should succeed")
            .clone()
    }
}

/// A stub engine listening on a loopback TCP port.
pub struct TcpStubEngine {
    /// The `host:port` the stub listens on.
    pub authority: String,
    /// Requests received so far.
    pub recorded: Recorded,
    _task: JoinHandle<()>,
}

impl TcpStubEngine {
    /// Binds a stub engine; must be called inside a tokio runtime.
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub listener should bind");
        let authority = listener
            .local_addr()
            .expect("stub listener should have an address")
            .to_string();
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(respond);
        let log = Arc::clone(&recorded);

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&responder), Arc::clone(&log)));
            }
        });

        Self {
            authority,
            recorded,
            _task: task,
        }
    }

    /// Returns a copy of every recorded request.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded
            .lock()
            .expect("record lock should succeed")
            .clone()
    }
}

async fn serve<S>(stream: S, respond: Responder, log: Recorded)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| {
        let respond = Arc::clone(&respond);
        let log = Arc::clone(&log);
        async move {
            let recorded = RecordedRequest::from_request(request).await;
            let canned = respond(&recorded);
            log.lock().expect("record lock should succeed").push(recorded);
            Ok::<_, Infallible>(canned.into_response())
        }
    });

    http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service)
        .await
        .ok();
}
