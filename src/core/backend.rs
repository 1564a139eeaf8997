//! Chat backends: the seam between a conversation and whatever produces the
//! assistant's text.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::models::fetch_models;
use crate::api::ChatMessage;
use crate::core::capabilities::Capabilities;
use crate::core::catalog::Service;
use crate::core::chat_stream::{spawn_stream, ReplyStream, StreamParams};
use crate::core::config::data::{Config, MockConfig};
use crate::core::mock::MockBackend;
use crate::core::providers::Provider;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Canned replies from the service descriptor, streamed word by word.
    #[default]
    Mock,
    /// Real chat-completion calls against the selected provider.
    Live,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendMode::Mock => "mock",
            BackendMode::Live => "live",
        })
    }
}

#[derive(Debug)]
pub struct ProbeError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capability probe failed: {}", self.0)
    }
}

impl StdError for ProbeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Everything a backend needs to produce one reply.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// User/assistant context ending with the new user message.
    pub messages: Vec<ChatMessage>,
}

impl ReplyRequest {
    pub fn latest_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == "user")
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn probe(&self) -> Result<Capabilities, ProbeError>;

    /// Start producing a reply. The returned stream is the only handle on the
    /// work; dropping it or firing `cancel_token` abandons the reply.
    fn stream_reply(&self, request: ReplyRequest, cancel_token: CancellationToken) -> ReplyStream;

    fn close(&self) {}
}

pub struct LiveBackend {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
}

impl LiveBackend {
    pub fn new(provider: Provider, model: &str, api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            model: model.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or(provider.base_url()).to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for LiveBackend {
    async fn probe(&self) -> Result<Capabilities, ProbeError> {
        let models = fetch_models(&self.client, &self.base_url, &self.api_key, self.provider)
            .await
            .map_err(ProbeError)?;
        debug!(
            provider = self.provider.id(),
            available = models.data.len(),
            "Provider reachable"
        );
        Ok(Capabilities::for_model(self.provider.find_model(&self.model)))
    }

    fn stream_reply(&self, request: ReplyRequest, cancel_token: CancellationToken) -> ReplyStream {
        let (tx, stream) = ReplyStream::channel(cancel_token.clone());
        spawn_stream(
            StreamParams {
                client: self.client.clone(),
                base_url: self.base_url.clone(),
                api_key: self.api_key.clone(),
                provider: self.provider,
                model: self.model.clone(),
                api_messages: request.messages,
            },
            tx,
            cancel_token,
        );
        stream
    }
}

/// Build the backend for a resolved provider and model.
pub fn build_backend(
    mode: BackendMode,
    provider: Provider,
    model: &str,
    api_key: &str,
    service: &Service,
    config: &Config,
) -> Box<dyn ChatBackend> {
    debug!(%mode, provider = provider.id(), model, service_id = %service.id, "Building chat backend");
    match mode {
        BackendMode::Mock => Box::new(MockBackend::new(
            service.clone(),
            config.mock.clone().unwrap_or_else(MockConfig::default),
        )),
        BackendMode::Live => Box::new(LiveBackend::new(
            provider,
            model,
            api_key,
            config.base_url_override(provider.id()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::load_builtin_services;

    #[test]
    fn backend_mode_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: BackendMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"live\"").unwrap();
        assert_eq!(parsed.mode, BackendMode::Live);
        assert_eq!(BackendMode::default(), BackendMode::Mock);
    }

    #[test]
    fn live_backend_honours_base_url_override() {
        let backend = LiveBackend::new(Provider::OpenAi, "gpt-4o", "k", Some("http://localhost:1"));
        assert_eq!(backend.base_url, "http://localhost:1");
        let backend = LiveBackend::new(Provider::Xai, "grok-1", "k", None);
        assert_eq!(backend.base_url, "https://api.x.ai/v1");
    }

    #[test]
    fn latest_user_message_skips_trailing_assistant_entries() {
        let request = ReplyRequest {
            messages: vec![
                ChatMessage::text("user", "first"),
                ChatMessage::text("assistant", "reply"),
                ChatMessage::text("user", "second"),
                ChatMessage::text("assistant", ""),
            ],
        };
        assert_eq!(request.latest_user_message().unwrap().text_content(), "second");
    }

    #[tokio::test]
    async fn live_probe_reports_unreachable_provider() {
        let service = load_builtin_services().remove(0);
        let config = Config {
            base_urls: [("openai".to_string(), "http://127.0.0.1:9".to_string())]
                .into_iter()
                .collect(),
            ..Config::default()
        };
        let backend = build_backend(
            BackendMode::Live,
            Provider::OpenAi,
            "gpt-4o",
            "sk-test",
            &service,
            &config,
        );
        assert!(backend.probe().await.is_err());
    }
}
