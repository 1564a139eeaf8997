use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::core::providers::Provider;
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Producer half of a [`ReplyStream`].
#[derive(Clone)]
pub struct StreamSender {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl StreamSender {
    /// Returns false once the consumer is gone.
    pub fn chunk(&self, content: impl Into<String>) -> bool {
        self.tx.send(StreamMessage::Chunk(content.into())).is_ok()
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.tx.send(StreamMessage::Error(message.into()));
        let _ = self.tx.send(StreamMessage::End);
    }

    pub fn end(&self) {
        let _ = self.tx.send(StreamMessage::End);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamFailure(pub String);

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StreamFailure {}

/// Text fragments of one reply, in arrival order.
///
/// The stream ends after the producer signals the end, after the first
/// error, or when the producer goes away. Dropping the stream cancels the
/// producer through its token.
#[derive(Debug)]
pub struct ReplyStream {
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    cancel_token: CancellationToken,
    finished: bool,
}

impl ReplyStream {
    pub fn channel(cancel_token: CancellationToken) -> (StreamSender, ReplyStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            StreamSender { tx },
            ReplyStream {
                rx,
                cancel_token,
                finished: false,
            },
        )
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Stream for ReplyStream {
    type Item = Result<String, StreamFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(StreamMessage::Chunk(content))) => Poll::Ready(Some(Ok(content))),
            Poll::Ready(Some(StreamMessage::Error(message))) => {
                this.finished = true;
                Poll::Ready(Some(Err(StreamFailure(message))))
            }
            Poll::Ready(Some(StreamMessage::End)) | Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ReplyStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(payload: &str, tx: &StreamSender) -> bool {
    if payload == "[DONE]" {
        tx.end();
        return true;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    if !content.is_empty() && !tx.chunk(content.clone()) {
                        return true;
                    }
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }

            tx.error(format_api_error(payload));
            true
        }
    }
}

fn process_sse_line(line: &str, tx: &StreamSender) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx))
        .unwrap_or(false)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub(crate) fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        if let Ok(compact) = serde_json::to_string(&json_value) {
            return format!("API Error: {compact}");
        }
    }

    format!("API Error: {trimmed}")
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub provider: Provider,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
}

/// Run one chat-completion request on the runtime, forwarding text deltas
/// into `tx` until the provider finishes, fails, or `cancel_token` fires.
pub fn spawn_stream(params: StreamParams, tx: StreamSender, cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let StreamParams {
            client,
            base_url,
            api_key,
            provider,
            model,
            api_messages,
        } = params;

        let request = ChatRequest {
            model,
            messages: api_messages,
            stream: true,
        };

        tokio::select! {
            _ = async {
                let chat_url = construct_api_url(&base_url, "chat/completions");
                debug!(provider = provider.id(), url = %chat_url, "Opening completion stream");
                let http_request = client
                    .post(chat_url)
                    .header("Content-Type", "application/json");
                let http_request =
                    crate::utils::auth::add_auth_headers(http_request, provider, &api_key);

                let response = match http_request.json(&request).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        tx.error(format_api_error(&e.to_string()));
                        return;
                    }
                };

                if !response.status().is_success() {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<no body>".to_string());
                    tx.error(format_api_error(&error_text));
                    return;
                }

                let mut stream = response.bytes_stream();
                let mut buffer: Vec<u8> = Vec::new();

                while let Some(chunk) = stream.next().await {
                    let chunk_bytes = match chunk {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tx.error(format_api_error(&e.to_string()));
                            return;
                        }
                    };
                    buffer.extend_from_slice(&chunk_bytes);

                    while let Some(newline_pos) = memchr(b'\n', &buffer) {
                        let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
                            Ok(line) => process_sse_line(line.trim(), &tx),
                            Err(e) => {
                                warn!(error = %e, "Invalid UTF-8 in stream");
                                false
                            }
                        };
                        buffer.drain(..=newline_pos);
                        if should_end {
                            return;
                        }
                    }
                }

                tx.end();
            } => {}
            _ = cancel_token.cancelled() => {
                debug!("Completion stream cancelled");
            }
        }
    });
}
