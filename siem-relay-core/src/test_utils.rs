//! Test doubles: a scripted vendor API server, an in-memory sink and watermark store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::Error;
use crate::Result;
use crate::secrets::ApiCredentials;
use crate::sink::{DeliveryStatus, Sink};
use crate::watermark::WatermarkStore;

pub(crate) fn credentials() -> ApiCredentials {
    ApiCredentials {
        api_key: "key-123".to_string(),
        basic_auth: "dXNlcjpwYXNz".to_string(),
    }
}

/// A vendor page body. `has_more` is set exactly when a cursor is given.
pub(crate) fn page(items: Vec<Value>, next: Option<&str>) -> Value {
    match next {
        Some(cursor) => json!({"items": items, "has_more": true, "next_cursor": cursor}),
        None => json!({"items": items, "has_more": false}),
    }
}

pub(crate) fn records(prefix: &str, range: Range<usize>) -> Vec<Value> {
    range
        .map(|i| json!({"id": format!("{prefix}-{i}"), "type": "Event::Endpoint::Threat::Detected"}))
        .collect()
}

pub(crate) enum Reply {
    Json(Value),
    Raw(u16, &'static str),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(body) => axum::Json(body).into_response(),
            Reply::Raw(status, body) => Response::builder()
                .status(StatusCode::from_u16(status).unwrap())
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(body))
                .unwrap(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct ServerState {
    scripts: HashMap<String, VecDeque<Reply>>,
    requests: Vec<RecordedRequest>,
}

/// Serves scripted replies per path, in order, and records every request it sees. A request
/// with nothing left to reply gets `418`.
pub(crate) struct VendorServer {
    pub(crate) base_url: String,
    state: Arc<Mutex<ServerState>>,
}

impl VendorServer {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(Mutex::new(ServerState::default()));
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub(crate) fn script(&self, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(path.to_string())
            .or_default()
            .extend(replies);
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(state): State<Arc<Mutex<ServerState>>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let path = uri.path().to_string();
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        path: path.clone(),
        query,
        headers,
    });
    match state.scripts.get_mut(&path).and_then(VecDeque::pop_front) {
        Some(reply) => reply.into_response(),
        None => (StatusCode::IM_A_TEAPOT, format!("no reply scripted for {path}")).into_response(),
    }
}

#[derive(Default)]
struct SinkState {
    calls: Vec<Vec<Bytes>>,
    delivered: Vec<Bytes>,
    rejections: HashMap<usize, Vec<usize>>,
    failing_calls: HashSet<usize>,
    reject_all: bool,
}

/// Records every delivery call. Rejections and whole-call failures can be injected by call
/// index.
#[derive(Clone, Default)]
pub(crate) struct CollectingSink {
    state: Arc<Mutex<SinkState>>,
}

impl CollectingSink {
    /// Rejects the payloads at `positions` of the `call`-th delivery.
    pub(crate) fn reject_on_call(self, call: usize, positions: &[usize]) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(call, positions.to_vec());
        self
    }

    pub(crate) fn reject_everything(self) -> Self {
        self.state.lock().unwrap().reject_all = true;
        self
    }

    pub(crate) fn fail_call(self, call: usize) -> Self {
        self.state.lock().unwrap().failing_calls.insert(call);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Bytes>> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Accepted payloads decoded back to records, in acceptance order.
    pub(crate) fn delivered_records(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .delivered
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

impl Sink for CollectingSink {
    async fn deliver(&mut self, payloads: Vec<Bytes>) -> Result<Vec<DeliveryStatus>> {
        let mut state = self.state.lock().unwrap();
        let call = state.calls.len();
        state.calls.push(payloads.clone());
        if state.failing_calls.contains(&call) {
            return Err(Error::Sink("injected call failure".to_string()));
        }

        let rejected = state.rejections.get(&call).cloned().unwrap_or_default();
        let mut statuses = Vec::with_capacity(payloads.len());
        for (position, payload) in payloads.into_iter().enumerate() {
            if state.reject_all || rejected.contains(&position) {
                statuses.push(DeliveryStatus::Failed(
                    "ServiceUnavailableException: Slow down.".to_string(),
                ));
            } else {
                state.delivered.push(payload);
                statuses.push(DeliveryStatus::Delivered);
            }
        }
        Ok(statuses)
    }
}

/// Watermark store kept in memory, counting writes.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub(crate) fn with(name: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        store
    }

    pub(crate) fn value(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub(crate) fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl WatermarkStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.value(name))
    }

    async fn put(&mut self, name: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
