//! Per-conversation chat client.
//!
//! A [`Conversation`] owns the transcript of one chat with one service and
//! the backend handle used to answer it. Its lifecycle:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> Sending -> Ready
//!                              \-> Error          \-> Error
//! ```
//!
//! Only one reply can stream at a time; a send while another is in flight is
//! rejected rather than queued.

use std::error::Error as StdError;
use std::fmt;

use chrono::Utc;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{self, ContentPart, ImageUrl, MessageContent};
use crate::core::attachment::Attachment;
use crate::core::backend::{build_backend, BackendMode, ChatBackend, ReplyRequest};
use crate::core::capabilities::Capabilities;
use crate::core::catalog::Service;
use crate::core::chat_stream::{ReplyStream, StreamFailure};
use crate::core::config::Config;
use crate::core::message::ChatMessage;
use crate::core::providers::Provider;
use crate::core::settings::Settings;

pub const CONNECTION_ERROR_TEXT: &str =
    "Failed to connect to MCP. Please check your settings and try again.";
pub const SEND_ERROR_TEXT: &str = "Failed to send message. Please try again.";
pub const SEND_ERROR_TRANSCRIPT_TEXT: &str =
    "Sorry, there was an error connecting to this MCP. Please try again later.";
pub const NOT_INITIALIZED_TEXT: &str = "MCP client not initialized. Please check your settings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Sending,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Provider, model or API key missing.
    Configuration(Vec<&'static str>),
    /// Unknown provider or failed capability probe.
    Connection(String),
    /// The reply stream failed.
    Send(String),
    SendInFlight,
    NotInitialized,
}

impl ChatError {
    /// Underlying cause, for logs; the `Display` text is the user-facing banner.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ChatError::Connection(detail) | ChatError::Send(detail) => Some(detail),
            _ => None,
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Configuration(missing) => write!(
                f,
                "Missing {}. Please configure your provider settings.",
                missing.join(", ")
            ),
            ChatError::Connection(_) => f.write_str(CONNECTION_ERROR_TEXT),
            ChatError::Send(_) => f.write_str(SEND_ERROR_TEXT),
            ChatError::SendInFlight => {
                f.write_str("A message is still being answered. Please wait for it to finish.")
            }
            ChatError::NotInitialized => f.write_str(NOT_INITIALIZED_TEXT),
        }
    }
}

impl StdError for ChatError {}

struct ActiveReply {
    message_id: String,
    cancel_token: CancellationToken,
}

pub struct Conversation {
    service: Service,
    config: Config,
    mode: BackendMode,
    settings: Settings,
    messages: Vec<ChatMessage>,
    state: ClientState,
    capabilities: Option<Capabilities>,
    error: Option<ChatError>,
    backend: Option<Box<dyn ChatBackend>>,
    active: Option<ActiveReply>,
}

impl Conversation {
    pub fn new(service: Service, settings: &Settings, config: &Config) -> Self {
        Self {
            service,
            mode: config.backend_mode(),
            config: config.clone(),
            settings: settings.clone(),
            messages: Vec::new(),
            state: ClientState::Uninitialized,
            capabilities: None,
            error: None,
            backend: None,
            active: None,
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_mode(mut self, mode: BackendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// The error banner currently shown for this conversation.
    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ClientState::Initializing | ClientState::Sending)
    }

    /// Start over with an empty transcript, keeping the client handle.
    pub fn reset_messages(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
            self.state = ClientState::Ready;
        }
        self.messages.clear();
    }

    fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.settings.provider.trim().is_empty() {
            missing.push("provider");
        }
        if self.settings.model.trim().is_empty() {
            missing.push("model");
        }
        if self.settings.api_key.trim().is_empty() {
            missing.push("API key");
        }
        missing
    }

    /// Resolve the provider, build the backend and probe its capabilities.
    pub async fn initialize(&mut self) -> Result<&Capabilities, ChatError> {
        if !self.settings.is_complete() {
            let err = ChatError::Configuration(self.missing_settings());
            self.state = ClientState::Uninitialized;
            self.error = Some(err.clone());
            return Err(err);
        }

        self.close();
        self.state = ClientState::Initializing;

        let provider = match Provider::from_id(&self.settings.provider) {
            Ok(provider) => provider,
            Err(err) => return Err(self.fail_connection(err.to_string())),
        };

        let backend = build_backend(
            self.mode,
            provider,
            &self.settings.model,
            &self.settings.api_key,
            &self.service,
            &self.config,
        );

        let probe = backend.probe().await;
        match probe {
            Ok(capabilities) => {
                debug!(
                    service_id = %self.service.id,
                    vision = capabilities.has_vision,
                    tools = capabilities.supported_tools.len(),
                    "Conversation ready"
                );
                self.backend = Some(backend);
                self.state = ClientState::Ready;
                self.error = None;
                Ok(self.capabilities.insert(capabilities))
            }
            Err(err) => {
                backend.close();
                Err(self.fail_connection(err.to_string()))
            }
        }
    }

    fn fail_connection(&mut self, detail: String) -> ChatError {
        warn!(service_id = %self.service.id, error = %detail, "Error initializing conversation");
        let err = ChatError::Connection(detail);
        self.state = ClientState::Error;
        self.capabilities = None;
        self.error = Some(err.clone());
        err
    }

    /// Take new settings. Returns true when the client depends on what
    /// changed and was torn down, meaning [`Conversation::initialize`] must
    /// run again.
    pub fn apply_settings(&mut self, settings: &Settings) -> bool {
        let changed = settings.client_key() != self.settings.client_key();
        self.settings = settings.clone();
        if changed {
            self.close();
            self.state = ClientState::Uninitialized;
            self.capabilities = None;
            self.error = None;
        }
        changed
    }

    /// Append the user message and an assistant placeholder, then open the
    /// reply stream. Chunks read from the stream belong in
    /// [`Conversation::apply_chunk`], and the outcome in
    /// [`Conversation::finish_send`].
    pub fn start_send(
        &mut self,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<ReplyStream, ChatError> {
        if self.state == ClientState::Sending {
            return Err(ChatError::SendInFlight);
        }
        let Some(backend) = self.backend.as_ref() else {
            self.error = Some(ChatError::NotInitialized);
            return Err(ChatError::NotInitialized);
        };
        let capabilities = self.capabilities.clone().unwrap_or_default();

        self.messages.push(
            ChatMessage::user(content).with_file(attachment.map(|a| a.reference.clone())),
        );
        let context = build_context(&self.messages, attachment, &capabilities);

        let message_id = next_message_id(&self.messages);
        self.messages.push(ChatMessage::placeholder(message_id.clone()));

        let cancel_token = CancellationToken::new();
        let stream = backend.stream_reply(
            ReplyRequest { messages: context },
            cancel_token.clone(),
        );

        debug!(service_id = %self.service.id, message_id = %message_id, "Sending message");
        self.state = ClientState::Sending;
        self.error = None;
        self.active = Some(ActiveReply {
            message_id,
            cancel_token,
        });
        Ok(stream)
    }

    /// Append a streamed fragment to the in-flight placeholder.
    pub fn apply_chunk(&mut self, chunk: &str) {
        let Some(active) = &self.active else {
            return;
        };
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.id.as_deref() == Some(active.message_id.as_str()))
        {
            message.content.push_str(chunk);
        }
    }

    pub fn finish_send(&mut self, outcome: Result<(), StreamFailure>) -> Result<(), ChatError> {
        self.active = None;
        match outcome {
            Ok(()) => {
                self.state = ClientState::Ready;
                Ok(())
            }
            Err(failure) => {
                warn!(service_id = %self.service.id, error = %failure, "Error sending message");
                self.messages
                    .push(ChatMessage::assistant(SEND_ERROR_TRANSCRIPT_TEXT));
                let err = ChatError::Send(failure.0);
                self.state = ClientState::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Send a message and drive its reply to completion, calling `on_chunk`
    /// with every fragment as it arrives.
    pub async fn send_message<F>(
        &mut self,
        content: &str,
        attachment: Option<&Attachment>,
        mut on_chunk: F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&str),
    {
        let mut stream = self.start_send(content, attachment)?;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    self.apply_chunk(&chunk);
                    on_chunk(&chunk);
                }
                Err(failure) => return self.finish_send(Err(failure)),
            }
        }
        self.finish_send(Ok(()))
    }

    /// Drop the client handle, abandoning any reply in flight.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
        if let Some(backend) = self.backend.take() {
            backend.close();
        }
        if self.state == ClientState::Sending {
            self.state = ClientState::Uninitialized;
        }
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        self.close();
    }
}

fn next_message_id(messages: &[ChatMessage]) -> String {
    let mut stamp = Utc::now().timestamp_millis();
    while messages
        .iter()
        .any(|m| m.id.as_deref() == Some(stamp.to_string().as_str()))
    {
        stamp += 1;
    }
    stamp.to_string()
}

/// Outgoing context for a reply: the transcript mapped to API roles, with
/// an image attachment added to the final user message only when the
/// service supports vision. Empty assistant entries (unfinished
/// placeholders) are skipped.
pub fn build_context(
    messages: &[ChatMessage],
    attachment: Option<&Attachment>,
    capabilities: &Capabilities,
) -> Vec<api::ChatMessage> {
    let last_user = messages.iter().rposition(|m| m.is_user());
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| !(m.is_assistant() && m.content.is_empty()))
        .map(|(index, message)| {
            let role = message.role.as_str();
            let image = attachment.filter(|a| {
                a.is_image() && capabilities.has_vision && Some(index) == last_user
            });
            match image {
                Some(image) => api::ChatMessage {
                    role: role.to_string(),
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: message.content.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image.data_url(),
                            },
                        },
                    ]),
                },
                None => api::ChatMessage::text(role, message.content.clone()),
            }
        })
        .collect()
}
