//! Remote authority client.
//!
//! # Responsibility
//! - Define the transport seam (`RemoteTransport`) carrying JSON documents.
//! - Provide typed whole-aggregate and child-collection operations.
//! - Classify failures so callers can pick local fallback or user reporting.
//!
//! # Invariants
//! - Nothing here retries; a failed write is reported exactly once.
//! - A create response must carry a durable identifier.
//!
//! # Paths
//! - `GET|PUT|DELETE /{kind}/{key}`, `POST /{kind}`
//! - `POST /{kind}/{ownerId}/{childKind}`
//! - `PUT|DELETE /{kind}/{ownerId}/{childKind}/{childId}`

use crate::model::aggregate::{Aggregate, AggregateKind};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod http;

pub use http::HttpTransport;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// How a caller should react to a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Authority unreachable: keep working locally, no user interruption.
    TransientNetwork,
    /// Missing or not visible to this user: read paths treat it as no data.
    NotFoundOrUnauthorized,
    /// Anything else: explicit actions surface it to the user.
    Unclassified,
}

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection refused, DNS failure, timeout.
    Unreachable(String),
    /// Authority answered with a non-success status.
    Status { status: u16, message: String },
    /// Response body did not match the expected representation.
    Decode(String),
    /// Request could not be built.
    InvalidRequest(String),
}

impl RemoteError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unreachable(_) => ErrorClass::TransientNetwork,
            Self::Status { status, .. } => match *status {
                401 | 403 | 404 => ErrorClass::NotFoundOrUnauthorized,
                502..=504 => ErrorClass::TransientNetwork,
                _ => ErrorClass::Unclassified,
            },
            Self::Decode(_) | Self::InvalidRequest(_) => ErrorClass::Unclassified,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::TransientNetwork
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "remote authority unreachable: {message}"),
            Self::Status { status, message } if message.is_empty() => {
                write!(f, "remote authority returned status {status}")
            }
            Self::Status { status, message } => {
                write!(f, "remote authority returned status {status}: {message}")
            }
            Self::Decode(message) => write!(f, "unexpected remote response: {message}"),
            Self::InvalidRequest(message) => write!(f, "invalid remote request: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Request/response seam to the remote authority.
///
/// `path` always starts with `/`. An empty success body is `Value::Null`.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn get(&self, path: &str) -> RemoteResult<Value>;
    async fn put(&self, path: &str, body: Value) -> RemoteResult<Value>;
    async fn post(&self, path: &str, body: Value) -> RemoteResult<Value>;
    async fn delete(&self, path: &str) -> RemoteResult<()>;
}

/// Typed operations over a `RemoteTransport`.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn RemoteTransport>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    /// Reads the canonical representation stored under `key`.
    pub async fn fetch<A: Aggregate>(&self, key: &str) -> RemoteResult<A> {
        let path = aggregate_path(A::KIND, key);
        let value = self.transport.get(&path).await.map_err(|err| {
            log_failure("GET", &path, &err);
            err
        })?;
        debug!("event=remote_call module=remote status=ok method=GET path={path}");
        decode(value)
    }

    /// Like `fetch`, but a not-found / unauthorized answer means no data.
    pub async fn fetch_optional<A: Aggregate>(&self, key: &str) -> RemoteResult<Option<A>> {
        match self.fetch(key).await {
            Ok(aggregate) => Ok(Some(aggregate)),
            Err(err) if err.class() == ErrorClass::NotFoundOrUnauthorized => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates `aggregate` remotely and returns the stored representation.
    pub async fn create<A: Aggregate>(&self, aggregate: &A) -> RemoteResult<A> {
        let path = format!("/{}", A::KIND.as_str());
        let value = self
            .transport
            .post(&path, encode(aggregate)?)
            .await
            .map_err(|err| {
                log_failure("POST", &path, &err);
                err
            })?;
        debug!("event=remote_call module=remote status=ok method=POST path={path}");

        let created: A = decode(value)?;
        if !created.id().is_durable() {
            return Err(RemoteError::Decode(format!(
                "create response for `{}` carries no durable id",
                A::KIND
            )));
        }
        Ok(created)
    }

    /// Replaces the representation stored under `key`.
    ///
    /// An empty response body echoes `aggregate` back.
    pub async fn update<A: Aggregate>(&self, key: &str, aggregate: &A) -> RemoteResult<A> {
        let path = aggregate_path(A::KIND, key);
        let value = self
            .transport
            .put(&path, encode(aggregate)?)
            .await
            .map_err(|err| {
                log_failure("PUT", &path, &err);
                err
            })?;
        debug!("event=remote_call module=remote status=ok method=PUT path={path}");

        if value.is_null() {
            return Ok(aggregate.clone());
        }
        decode(value)
    }

    pub async fn delete(&self, kind: AggregateKind, key: &str) -> RemoteResult<()> {
        let path = aggregate_path(kind, key);
        self.transport.delete(&path).await.map_err(|err| {
            log_failure("DELETE", &path, &err);
            err
        })?;
        debug!("event=remote_call module=remote status=ok method=DELETE path={path}");
        Ok(())
    }

    /// Creates one child entry under an owner's composite aggregate.
    pub async fn create_child<T>(
        &self,
        kind: AggregateKind,
        owner_id: &str,
        child_kind: &str,
        body: &T,
    ) -> RemoteResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = format!("{}/{child_kind}", aggregate_path(kind, owner_id));
        let value = self
            .transport
            .post(&path, encode(body)?)
            .await
            .map_err(|err| {
                log_failure("POST", &path, &err);
                err
            })?;
        debug!("event=remote_call module=remote status=ok method=POST path={path}");
        decode(value)
    }

    pub async fn update_child<T>(
        &self,
        kind: AggregateKind,
        owner_id: &str,
        child_kind: &str,
        child_id: &str,
        body: &T,
    ) -> RemoteResult<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let path = child_path(kind, owner_id, child_kind, child_id);
        let value = self
            .transport
            .put(&path, encode(body)?)
            .await
            .map_err(|err| {
                log_failure("PUT", &path, &err);
                err
            })?;
        debug!("event=remote_call module=remote status=ok method=PUT path={path}");
        if value.is_null() {
            return Ok(body.clone());
        }
        decode(value)
    }

    pub async fn delete_child(
        &self,
        kind: AggregateKind,
        owner_id: &str,
        child_kind: &str,
        child_id: &str,
    ) -> RemoteResult<()> {
        let path = child_path(kind, owner_id, child_kind, child_id);
        self.transport.delete(&path).await.map_err(|err| {
            log_failure("DELETE", &path, &err);
            err
        })?;
        debug!("event=remote_call module=remote status=ok method=DELETE path={path}");
        Ok(())
    }
}

fn aggregate_path(kind: AggregateKind, key: &str) -> String {
    format!("/{}/{key}", kind.as_str())
}

fn child_path(kind: AggregateKind, owner_id: &str, child_kind: &str, child_id: &str) -> String {
    format!("{}/{child_kind}/{child_id}", aggregate_path(kind, owner_id))
}

fn encode<T: Serialize>(value: &T) -> RemoteResult<Value> {
    serde_json::to_value(value).map_err(|err| RemoteError::InvalidRequest(err.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> RemoteResult<T> {
    serde_json::from_value(value).map_err(|err| RemoteError::Decode(err.to_string()))
}

fn log_failure(method: &str, path: &str, err: &RemoteError) {
    debug!(
        "event=remote_call module=remote status=error method={method} path={path} class={:?} error={}",
        err.class(),
        err
    );
}
