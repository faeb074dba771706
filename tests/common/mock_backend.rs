//! Mock REST backend for exercising the blocking HTTP remote.
//!
//! The server runs on its own tokio runtime thread so tests stay plain
//! synchronous `#[test]`s, as the blocking client must not run inside a runtime.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// A captured request for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub cookie: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: serde_json::Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::with_status(status, serde_json::json!({ "error": message }))
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Clone, Default)]
struct Shared {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockBackend {
    addr: SocketAddr,
    shared: Shared,
}

impl MockBackend {
    pub fn start() -> Self {
        let shared = Shared::default();
        let app_state = shared.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("mock runtime");
            rt.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
                tx.send(listener.local_addr().expect("mock addr"))
                    .expect("report mock addr");
                let app = Router::new().fallback(handle).with_state(app_state);
                axum::serve(listener, app).await.expect("serve mock");
            });
        });
        let addr = rx.recv().expect("mock backend address");
        Self { addr, shared }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Queues a response; requests beyond the queue get `200 []`.
    pub fn respond(&self, response: MockResponse) -> &Self {
        self.shared.responses.lock().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.shared.captured.lock().clone()
    }
}

async fn handle(State(shared): State<Shared>, req: Request<Body>) -> Response<Body> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let cookie = req
        .headers()
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    shared.captured.lock().push(CapturedRequest {
        method,
        path,
        cookie,
        body,
    });

    let response = shared
        .responses
        .lock()
        .pop_front()
        .unwrap_or_else(|| MockResponse::json(serde_json::json!([])));
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body))
        .expect("mock response")
}
