//! Simulated service backend.
//!
//! Replies come from the service descriptor's canned keyword responses and
//! are streamed word by word with small random pauses.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::backend::{ChatBackend, ProbeError, ReplyRequest};
use crate::core::capabilities::Capabilities;
use crate::core::catalog::Service;
use crate::core::chat_stream::ReplyStream;
use crate::core::config::data::MockConfig;

const IMAGE_PREFIX: &str = "He recibido su imagen. ";

pub struct MockBackend {
    service: Service,
    config: MockConfig,
}

impl MockBackend {
    pub fn new(service: Service, config: MockConfig) -> Self {
        Self { service, config }
    }

    /// Full reply text for a request, before chunking.
    pub fn reply_text(&self, request: &ReplyRequest) -> String {
        let latest = request.latest_user_message();
        let content = latest.map(|m| m.text_content()).unwrap_or_default();

        let mut reply = match self.service.find_mock_response(&content) {
            Some(matched) => matched.response.clone(),
            None => default_reply(&self.service.id),
        };

        if latest.is_some_and(|m| m.has_image()) {
            reply.insert_str(0, IMAGE_PREFIX);
        }
        reply
    }
}

fn default_reply(service_id: &str) -> String {
    format!(
        "Gracias por su mensaje. Como MCP especializado en {}, puedo ayudarle con consultas relacionadas. ¿Podría proporcionar más detalles sobre su solicitud?",
        service_id.replacen('-', " ", 1)
    )
}

/// Split a reply into the chunks the stream emits: every space-separated
/// word followed by a single space.
pub fn word_chunks(text: &str) -> Vec<String> {
    text.split(' ').map(|word| format!("{word} ")).collect()
}

fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    let mut bytes = [0u8; 8];
    let offset = match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes) % (max_ms - min_ms),
        Err(_) => (max_ms - min_ms) / 2,
    };
    Duration::from_millis(min_ms + offset)
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn probe(&self) -> Result<Capabilities, ProbeError> {
        tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        Ok(Capabilities::for_mock_service(&self.service.id))
    }

    fn stream_reply(&self, request: ReplyRequest, cancel_token: CancellationToken) -> ReplyStream {
        let (tx, stream) = ReplyStream::channel(cancel_token.clone());
        let chunks = word_chunks(&self.reply_text(&request));
        let config = self.config.clone();
        let service_id = self.service.id.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = async {
                    tokio::time::sleep(Duration::from_millis(config.latency_ms)).await;
                    for chunk in chunks {
                        if !tx.chunk(chunk) {
                            return;
                        }
                        tokio::time::sleep(random_delay(
                            config.chunk_delay_min_ms,
                            config.chunk_delay_max_ms,
                        ))
                        .await;
                    }
                    tx.end();
                } => {}
                _ = cancel_token.cancelled() => {
                    debug!(service_id = %service_id, "Mock reply cancelled");
                }
            }
        });

        stream
    }

    fn close(&self) {
        debug!(service_id = %self.service.id, "Closing mock service connection");
    }
}
