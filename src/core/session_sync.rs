//! Binding between a live conversation and its stored session.

use tracing::{debug, warn};

use crate::core::message::ChatMessage;
use crate::core::sessions::{derive_title, SessionStore};
use crate::core::storage::StorageError;

/// Tracks which stored session, if any, a conversation writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSync {
    mcp_id: String,
    chat_id: Option<String>,
}

impl SessionSync {
    pub fn new(mcp_id: impl Into<String>) -> Self {
        Self {
            mcp_id: mcp_id.into(),
            chat_id: None,
        }
    }

    /// Bind to `chat_id` and return its messages. A session stored for a
    /// different service (or a missing one) is not bound and yields no
    /// messages.
    pub fn resume(store: &SessionStore, mcp_id: &str, chat_id: &str) -> (Self, Vec<ChatMessage>) {
        let mut sync = Self::new(mcp_id);
        match store.get(chat_id) {
            Some(session) if session.mcp_id == mcp_id => {
                debug!(session_id = %chat_id, messages = session.messages.len(), "Resumed chat session");
                sync.chat_id = Some(chat_id.to_string());
                (sync, session.messages.clone())
            }
            Some(session) => {
                warn!(
                    session_id = %chat_id,
                    stored_for = %session.mcp_id,
                    requested = %mcp_id,
                    "Chat session belongs to another service; starting fresh"
                );
                (sync, Vec::new())
            }
            None => {
                warn!(session_id = %chat_id, "Chat session not found; starting fresh");
                (sync, Vec::new())
            }
        }
    }

    pub fn mcp_id(&self) -> &str {
        &self.mcp_id
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    /// Forget the bound session; the next exchange starts a new one.
    pub fn reset(&mut self) {
        self.chat_id = None;
    }

    /// Persist the transcript after an exchange. Creates the session once
    /// there is a full exchange to save; updates it afterwards.
    pub fn sync(
        &mut self,
        store: &mut SessionStore,
        messages: &[ChatMessage],
    ) -> Result<Option<&str>, StorageError> {
        if messages.is_empty() {
            return Ok(self.chat_id());
        }

        let chat_id = match &self.chat_id {
            Some(id) => id.clone(),
            None if messages.len() >= 2 => {
                let id = store.create(&self.mcp_id, &derive_title(&messages[0].content))?;
                self.chat_id = Some(id.clone());
                id
            }
            None => return Ok(None),
        };

        store.update(&chat_id, messages)?;
        Ok(self.chat_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{MemoryStorage, Storage};
    use std::sync::Arc;

    fn store() -> SessionStore {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        SessionStore::load(storage).unwrap()
    }

    fn exchange() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("How do I register a business here?"),
            ChatMessage::assistant("Para registrar un negocio..."),
        ]
    }

    #[test]
    fn single_message_is_not_saved() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");
        let saved = sync
            .sync(&mut store, &[ChatMessage::user("hola")])
            .unwrap();
        assert_eq!(saved, None);
        assert!(store.list().is_empty());
    }

    #[test]
    fn first_exchange_creates_titled_session() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");

        let id = sync
            .sync(&mut store, &exchange())
            .unwrap()
            .map(str::to_string)
            .expect("session created");

        let session = store.get(&id).unwrap();
        assert_eq!(session.mcp_id, "legal-advisor");
        assert_eq!(session.title, "How do I register a...");
        assert_eq!(session.messages, exchange());
        assert_eq!(session.last_message, "Para registrar un negocio...");
    }

    #[test]
    fn later_exchanges_update_the_bound_session() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");
        let mut messages = exchange();
        sync.sync(&mut store, &messages).unwrap();

        messages.push(ChatMessage::user("divorce"));
        messages.push(ChatMessage::assistant("En la República Dominicana..."));
        sync.sync(&mut store, &messages).unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].messages.len(), 4);
    }

    #[test]
    fn reset_starts_a_new_session() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");
        sync.sync(&mut store, &exchange()).unwrap();
        let first = sync.chat_id().unwrap().to_string();

        sync.reset();
        assert_eq!(sync.chat_id(), None);
        sync.sync(&mut store, &exchange()).unwrap();

        assert_eq!(store.list().len(), 2);
        assert_ne!(sync.chat_id(), Some(first.as_str()));
    }

    #[test]
    fn resume_restores_matching_service_only() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");
        sync.sync(&mut store, &exchange()).unwrap();
        let id = sync.chat_id().unwrap().to_string();

        let (resumed, messages) = SessionSync::resume(&store, "legal-advisor", &id);
        assert_eq!(resumed.chat_id(), Some(id.as_str()));
        assert_eq!(messages, exchange());

        let (other, messages) = SessionSync::resume(&store, "tax-consultant", &id);
        assert_eq!(other.chat_id(), None);
        assert!(messages.is_empty());

        let (missing, messages) = SessionSync::resume(&store, "legal-advisor", "nope");
        assert_eq!(missing.chat_id(), None);
        assert!(messages.is_empty());
    }

    #[test]
    fn bound_session_deleted_elsewhere_is_not_recreated() {
        let mut store = store();
        let mut sync = SessionSync::new("legal-advisor");
        sync.sync(&mut store, &exchange()).unwrap();
        let id = sync.chat_id().unwrap().to_string();
        store.delete(&id).unwrap();

        sync.sync(&mut store, &exchange()).unwrap();
        assert!(store.list().is_empty());
    }
}
