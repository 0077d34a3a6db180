#![allow(dead_code)]

use async_trait::async_trait;
use edusync_core::{
    KindPolicies, MemoryKeyValueStore, RemoteError, RemoteTransport, SessionIdentity,
    SyncContext,
};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;

pub const OWNER: &str = "u1";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct AuthorityState {
    documents: BTreeMap<String, Value>,
    calls: Vec<Call>,
    scripted_failures: VecDeque<RemoteError>,
}

/// In-memory remote authority. Creates assign ids 101, 102, ...
pub struct ScriptedAuthority {
    state: Mutex<AuthorityState>,
    unreachable: AtomicBool,
    next_id: AtomicU64,
    latency_ms: AtomicU64,
}

impl ScriptedAuthority {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(AuthorityState::default()),
            unreachable: AtomicBool::new(false),
            next_id: AtomicU64::new(101),
            latency_ms: AtomicU64::new(0),
        })
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Every call completes `latency` after it was issued. Calls are logged
    /// on completion.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Next create is answered with `id` again.
    pub fn reissue_id(&self, id: u64) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    /// Next call fails with `err` instead of being served.
    pub fn fail_next(&self, err: RemoteError) {
        self.state().scripted_failures.push_back(err);
    }

    pub fn seed(&self, path: &str, document: Value) {
        self.state().documents.insert(path.to_string(), document);
    }

    pub fn document(&self, path: &str) -> Option<Value> {
        self.state().documents.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn last_body(&self, method: &str, path: &str) -> Option<Value> {
        self.state()
            .calls
            .iter()
            .rev()
            .find(|call| call.method == method && call.path == path)
            .and_then(|call| call.body.clone())
    }

    fn state(&self) -> MutexGuard<'_, AuthorityState> {
        self.state.lock().unwrap()
    }

    async fn wait_latency(&self) {
        let millis = self.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn begin(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutexGuard<'_, AuthorityState>, RemoteError> {
        let mut state = self.state();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            body,
        });
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable("connection refused".to_string()));
        }
        if let Some(err) = state.scripted_failures.pop_front() {
            return Err(err);
        }
        Ok(state)
    }
}

fn not_found(path: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        message: format!("no document at {path}"),
    }
}

#[async_trait]
impl RemoteTransport for ScriptedAuthority {
    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.wait_latency().await;
        let state = self.begin("GET", path, None)?;
        state.documents.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        self.wait_latency().await;
        let mut state = self.begin("PUT", path, Some(body.clone()))?;
        state.documents.insert(path.to_string(), body.clone());
        Ok(body)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        self.wait_latency().await;
        let mut state = self.begin("POST", path, Some(body.clone()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut stored = body;
        if let Value::Object(fields) = &mut stored {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }
        state
            .documents
            .insert(format!("{path}/{id}"), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.wait_latency().await;
        let mut state = self.begin("DELETE", path, None)?;
        state
            .documents
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

pub struct Harness {
    pub authority: Arc<ScriptedAuthority>,
    pub store: Arc<MemoryKeyValueStore>,
    pub context: SyncContext,
}

pub fn session() -> SessionIdentity {
    SessionIdentity::new(OWNER)
        .with_name("Ada Park")
        .with_email("ada@example.edu")
}

pub fn harness() -> Harness {
    harness_with(KindPolicies::default())
}

pub fn harness_with(policies: KindPolicies) -> Harness {
    let authority = ScriptedAuthority::new();
    let store = Arc::new(MemoryKeyValueStore::new());
    let context = SyncContext::new(
        session(),
        store.clone(),
        authority.clone(),
        policies,
        Handle::current(),
    );
    Harness {
        authority,
        store,
        context,
    }
}

/// Lets paused time run past `millis` so pending flushes fire.
pub async fn wait_ms(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
