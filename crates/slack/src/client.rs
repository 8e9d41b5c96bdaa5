//! Slack Web API client.
//!
//! Thin wrapper over the two methods courier calls: `views.open` and
//! `chat.postMessage`. Web API errors arrive as HTTP 200 with `"ok": false`,
//! so the response body is inspected in addition to the status line.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use crate::blocks::ModalView;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("slack api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api `{method}` returned http status {status}")]
    Status { method: String, status: u16 },
    #[error("slack api `{method}` returned error `{code}`")]
    Api { method: String, code: String },
}

/// The outbound Slack surface handlers depend on.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), ClientError>;
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ClientError>;
}

pub struct SlackApiClient {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl SlackApiClient {
    pub fn new(bot_token: SecretString) -> Result<Self, ClientError> {
        Self::with_base_url(bot_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        bot_token: SecretString,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, bot_token, base_url: base_url.into() })
    }

    pub fn into_shared(self) -> Arc<dyn ChatClient> {
        Arc::new(self)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }

    async fn call(&self, method: &str, payload: Value) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { method: method.to_owned(), status: status.as_u16() });
        }

        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_owned();
            return Err(ClientError::Api { method: method.to_owned(), code });
        }

        Ok(())
    }
}

#[async_trait]
impl ChatClient for SlackApiClient {
    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), ClientError> {
        tracing::debug!(method = "views.open", trigger_id, "calling slack web api");
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ClientError> {
        tracing::debug!(method = "chat.postMessage", channel, "calling slack web api");
        self.call("chat.postMessage", json!({ "channel": channel, "text": text })).await
    }
}
