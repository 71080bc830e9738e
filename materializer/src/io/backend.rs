//! Backend abstraction for the model exchange.
//!
//! The [`Backend`] trait decouples the generation session from the transport.
//! [`HttpBackend`] talks to the builder API over HTTP; tests use scripted
//! backends that return predetermined replies without touching the network.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::Message;

/// Failure of a single backend exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Request quota exceeded. `None` when the backend gave no retry hint.
    #[error("backend throttled the request")]
    Throttled { retry_after_secs: Option<u64> },
    #[error("{0}")]
    Failed(String),
}

/// Project template returned before the first chat exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Context messages prepended to the user's prompt.
    #[serde(default)]
    pub prompts: Vec<String>,
    /// Replies whose first entry holds the template's own build steps.
    #[serde(default)]
    pub ui_prompts: Vec<String>,
}

/// Abstraction over model backends.
pub trait Backend {
    /// Fetch the project template for an initial prompt.
    fn template(&self, prompt: &str) -> Result<Template, ExchangeError>;

    /// Send the full conversation and return the assistant's raw reply.
    fn exchange(&self, history: &[Message]) -> Result<String, ExchangeError>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn template(&self, prompt: &str) -> Result<Template, ExchangeError> {
        (**self).template(prompt)
    }

    fn exchange(&self, history: &[Message]) -> Result<String, ExchangeError> {
        (**self).exchange(history)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    retry_after: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Backend reached over HTTP (`POST /template`, `POST /chat`).
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ExchangeError> {
        let url = self.endpoint(path);
        debug!(%url, "posting to backend");
        match self.agent.post(&url).send_json(body) {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|err| ExchangeError::Failed(format!("decode {path} response: {err}"))),
            Err(ureq::Error::Status(429, response)) => {
                let header = response
                    .header("retry-after")
                    .and_then(|value| value.trim().parse::<u64>().ok());
                let body = response.into_json::<ErrorBody>().unwrap_or_default();
                let retry_after_secs = body.retry_after.or(header);
                warn!(?retry_after_secs, "backend throttled request");
                Err(ExchangeError::Throttled { retry_after_secs })
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_json::<ErrorBody>().unwrap_or_default();
                let message = body
                    .message
                    .unwrap_or_else(|| format!("{path} returned status {code}"));
                warn!(code, %message, "backend request failed");
                Err(ExchangeError::Failed(message))
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(error = %transport, "backend transport failed");
                Err(ExchangeError::Failed(transport.to_string()))
            }
        }
    }
}

impl Backend for HttpBackend {
    #[instrument(skip_all)]
    fn template(&self, prompt: &str) -> Result<Template, ExchangeError> {
        self.post_json("template", json!({ "prompt": prompt.trim() }))
    }

    #[instrument(skip_all, fields(messages = history.len()))]
    fn exchange(&self, history: &[Message]) -> Result<String, ExchangeError> {
        let response: ChatResponse = self.post_json("chat", json!({ "messages": history }))?;
        Ok(response.response)
    }
}
