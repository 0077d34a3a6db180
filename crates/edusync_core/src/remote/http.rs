//! HTTP transport to the remote authority.

use super::{RemoteError, RemoteResult, RemoteTransport};
use crate::config::RemoteConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// `RemoteTransport` over JSON HTTP.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| RemoteError::InvalidRequest(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Value> {
        let request = match self.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body = response.bytes().await.map_err(classify_transport_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn get(&self, path: &str) -> RemoteResult<Value> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn put(&self, path: &str, body: Value) -> RemoteResult<Value> {
        self.send(self.client.put(self.url(path)).json(&body)).await
    }

    async fn post(&self, path: &str, body: Value) -> RemoteResult<Value> {
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

fn classify_transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_builder() {
        return RemoteError::InvalidRequest(err.to_string());
    }
    if err.is_decode() {
        return RemoteError::Decode(err.to_string());
    }
    // Connect, timeout and mid-body failures all mean the authority was not
    // reached in a usable way.
    RemoteError::Unreachable(err.to_string())
}
