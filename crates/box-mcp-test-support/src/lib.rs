//! In-process upstreams for exercising the Box invoker without touching the network.
//!
//! [`EchoServer::start`] answers every request with a JSON description of what it received
//! (httpbin `/anything` style). [`EchoServer::stub`] answers every request with a fixed status,
//! content type and body. Both record the requests they saw.

use anyhow::Context as _;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// One request as seen by the upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let needle = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == needle)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Describe the request the way the echo upstream answers it.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "headers": headers,
            "contentType": self.header("content-type"),
            "body": self.body_text(),
            "bodyBase64": base64::engine::general_purpose::STANDARD.encode(&self.body),
            "json": serde_json::from_slice::<Value>(&self.body).ok(),
        })
    }
}

#[derive(Clone)]
enum Reply {
    Echo,
    Fixed {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Vec<u8>,
    },
}

struct Shared {
    reply: Reply,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A local HTTP upstream bound to `127.0.0.1:0`. Shuts down on drop.
pub struct EchoServer {
    base_url: String,
    shared: Arc<Shared>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl EchoServer {
    /// Start an upstream that echoes each request back as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if binding a localhost port fails.
    pub async fn start() -> anyhow::Result<Self> {
        Self::spawn(Reply::Echo).await
    }

    /// Start an upstream that answers every request with the same response.
    ///
    /// # Errors
    ///
    /// Returns an error if the status or content type is invalid, or binding a port fails.
    pub async fn stub(
        status: u16,
        content_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> anyhow::Result<Self> {
        let status = StatusCode::from_u16(status).context("invalid status code")?;
        let content_type = content_type
            .map(HeaderValue::from_str)
            .transpose()
            .context("invalid content type")?;
        Self::spawn(Reply::Fixed {
            status,
            content_type,
            body: body.into(),
        })
        .await
    }

    async fn spawn(reply: Reply) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind ephemeral port")?;
        let addr = listener.local_addr().context("read local address")?;

        let shared = Arc::new(Shared {
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&shared));

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shared,
            shutdown: Some(tx),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().clone()
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        self.shared.requests.lock().len()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.shared.requests.lock().last().cloned()
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(State(shared): State<Arc<Shared>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(b) => b.to_vec(),
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body,
    };
    let echo = recorded.to_json();
    shared.requests.lock().push(recorded);

    match &shared.reply {
        Reply::Echo => axum::Json(echo).into_response(),
        Reply::Fixed {
            status,
            content_type,
            body,
        } => {
            let mut response = Response::new(Body::from(body.clone()));
            *response.status_mut() = *status;
            if let Some(ct) = content_type {
                response.headers_mut().insert(CONTENT_TYPE, ct.clone());
            }
            response
        }
    }
}
