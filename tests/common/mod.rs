//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use definition_gateway::collaborators::{
    BackendError, BackendResult, OutboundExecutor, OutboundRequest, OutboundResponse, SqlExecutor,
    SqlRequest,
};
use definition_gateway::definition::Definition;
use definition_gateway::handlers::{BuildResult, Handler, HandlerFactory};
use definition_gateway::http::{GatewayResponse, RequestContext};
use definition_gateway::lifecycle::{Job, JobHandle, Scheduler};
use definition_gateway::registry::{ContentProvider, RegistryOptions, RetryPolicy};
use definition_gateway::shaping::Record;

/// Handler answering with its route and build number.
pub struct CountingHandler {
    pub route: String,
    pub build: usize,
    pub suspends: AtomicUsize,
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle(&self, _request: RequestContext) -> GatewayResponse {
        GatewayResponse::json(
            StatusCode::OK,
            json!({ "route": self.route, "build": self.build }),
        )
    }

    fn suspend(&self) {
        self.suspends.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory keeping every handler it built, in build order.
#[derive(Default)]
pub struct CountingFactory {
    pub built: Mutex<Vec<Arc<CountingHandler>>>,
}

impl CountingFactory {
    pub fn handler(&self, index: usize) -> Arc<CountingHandler> {
        Arc::clone(&self.built.lock().unwrap()[index])
    }

    pub fn build_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }
}

impl HandlerFactory for CountingFactory {
    fn build(&self, definition: Arc<Definition>) -> BuildResult<Arc<dyn Handler>> {
        let mut built = self.built.lock().unwrap();
        let handler = Arc::new(CountingHandler {
            route: definition.route_template.clone(),
            build: built.len() + 1,
            suspends: AtomicUsize::new(0),
        });
        built.push(Arc::clone(&handler));
        Ok(handler)
    }
}

/// Definition files held in memory.
#[derive(Default)]
pub struct MemoryContent {
    files: Mutex<BTreeMap<PathBuf, String>>,
    pub reads: AtomicUsize,
}

impl MemoryContent {
    pub fn put(&self, path: impl Into<PathBuf>, text: &str) {
        self.files.lock().unwrap().insert(path.into(), text.to_string());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.lock().unwrap().remove(path.as_ref());
    }
}

#[async_trait]
impl ContentProvider for MemoryContent {
    async fn list(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(root))
            .filter(|p| p.extension().is_some_and(|e| e == extension))
            .cloned()
            .collect())
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such definition"))
    }
}

/// Registry options without read delays.
pub fn fast_options() -> RegistryOptions {
    RegistryOptions {
        extension: "api".to_string(),
        introspection_route: Some("help".to_string()),
        retry: RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
        },
    }
}

/// SQL executor returning fixed rows and recording each request.
#[derive(Default)]
pub struct FakeSql {
    pub rows: Mutex<Vec<Record>>,
    pub requests: Mutex<Vec<SqlRequest>>,
    pub fail: AtomicBool,
}

impl FakeSql {
    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn last_request(&self) -> Option<SqlRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SqlExecutor for FakeSql {
    async fn execute(&self, request: SqlRequest) -> BackendResult<Vec<Record>> {
        self.requests.lock().unwrap().push(request);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Execution("login failed for user sa".into()));
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Outbound executor answering with one canned response.
pub struct FakeOutbound {
    pub response: Mutex<BackendResult<OutboundResponse>>,
    pub requests: Mutex<Vec<OutboundRequest>>,
}

impl FakeOutbound {
    pub fn new(status: u16, content_type: &str, body: &str) -> Self {
        let mut headers = std::collections::HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            response: Mutex::new(Ok(OutboundResponse {
                status,
                headers,
                body: body.to_string().into(),
            })),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Mutex::new(Err(BackendError::Transport("connection refused".into()))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OutboundExecutor for FakeOutbound {
    async fn send(&self, request: OutboundRequest) -> BackendResult<OutboundResponse> {
        self.requests.lock().unwrap().push(request);
        self.response.lock().unwrap().clone()
    }
}

/// Scheduler whose jobs only run when the test says so.
#[derive(Default)]
pub struct ManualScheduler {
    jobs: Mutex<Vec<(Job, Arc<AtomicBool>)>>,
}

impl ManualScheduler {
    /// Run every job that has not been stopped, once.
    pub async fn tick(&self) {
        let live: Vec<Job> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, stopped)| !stopped.load(Ordering::SeqCst))
            .map(|(job, _)| Arc::clone(job))
            .collect();
        for job in live {
            job().await;
        }
    }

    pub fn started(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn running(&self) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, stopped)| !stopped.load(Ordering::SeqCst))
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, _interval: Duration, job: Job) -> Box<dyn JobHandle> {
        let stopped = Arc::new(AtomicBool::new(false));
        self.jobs.lock().unwrap().push((job, Arc::clone(&stopped)));
        Box::new(ManualHandle { stopped })
    }
}

struct ManualHandle {
    stopped: Arc<AtomicBool>,
}

impl JobHandle for ManualHandle {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Build a record from `json!({...})`.
pub fn row(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
