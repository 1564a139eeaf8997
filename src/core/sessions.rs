//! Persistent chat sessions.
//!
//! The whole collection lives in a single storage document and is rewritten
//! on every mutation. Newest sessions come first.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::ChatMessage;
use crate::core::storage::{write_json, Storage, StorageError, CHATS_KEY};

const PREVIEW_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub mcp_id: String,
    pub title: String,
    #[serde(default)]
    pub last_message: String,
    pub timestamp: i64,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub enum ImportError {
    Parse(serde_json::Error),
    Storage(StorageError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Parse(err) => write!(f, "Invalid chat export: {err}"),
            ImportError::Storage(err) => write!(f, "Failed to save imported chats: {err}"),
        }
    }
}

impl StdError for ImportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ImportError::Parse(err) => Some(err),
            ImportError::Storage(err) => Some(err),
        }
    }
}

/// Preview text for a session list: the first 50 characters of the last
/// message, with `...` when truncated.
pub fn preview(messages: &[ChatMessage]) -> String {
    let Some(last) = messages.last() else {
        return String::new();
    };
    let mut graphemes = last.content.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_LEN).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Session title derived from the first words of the opening message.
pub fn derive_title(first_message: &str) -> String {
    let words: Vec<&str> = first_message.split(' ').take(5).collect();
    format!("{}...", words.join(" "))
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("mcp-chats-{}.json", date.format("%Y-%m-%d"))
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    sessions: Vec<ChatSession>,
}

impl SessionStore {
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let sessions = match storage.get_item(CHATS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "Failed to parse stored chats; starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        debug!(count = sessions.len(), "Loaded chat sessions");
        Ok(Self { storage, sessions })
    }

    pub fn list(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn sessions_for<'a>(&'a self, mcp_id: &'a str) -> impl Iterator<Item = &'a ChatSession> {
        self.sessions.iter().filter(move |s| s.mcp_id == mcp_id)
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn create(&mut self, mcp_id: &str, title: &str) -> Result<String, StorageError> {
        let now = Utc::now().timestamp_millis();
        let mut stamp = now;
        while self.get(&stamp.to_string()).is_some() {
            stamp += 1;
        }
        let id = stamp.to_string();

        let mut next = Vec::with_capacity(self.sessions.len() + 1);
        next.push(ChatSession {
            id: id.clone(),
            mcp_id: mcp_id.to_string(),
            title: title.to_string(),
            last_message: String::new(),
            timestamp: now,
            messages: Vec::new(),
        });
        next.extend(self.sessions.iter().cloned());
        self.commit(next)?;
        debug!(session_id = %id, mcp_id, "Created chat session");
        Ok(id)
    }

    /// Replace a session's messages. Returns whether anything was written.
    pub fn update(&mut self, id: &str, messages: &[ChatMessage]) -> Result<bool, StorageError> {
        let Some(existing) = self.get(id) else {
            return Ok(false);
        };
        if existing.messages == messages {
            return Ok(false);
        }

        let last_message = preview(messages);
        let timestamp = Utc::now().timestamp_millis();
        let mut next = self.sessions.clone();
        for session in next.iter_mut().filter(|s| s.id == id) {
            session.messages = messages.to_vec();
            session.last_message = last_message.clone();
            session.timestamp = timestamp;
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Remove every session carrying `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self.sessions.iter().filter(|s| s.id != id).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.commit(Vec::new())
    }

    pub fn export(&self) -> String {
        // A Vec of plain structs always serializes.
        serde_json::to_string_pretty(&self.sessions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Prepend the sessions in `blob` to the collection. Identifiers are not
    /// de-duplicated.
    pub fn import(&mut self, blob: &str) -> Result<usize, ImportError> {
        let imported: Vec<ChatSession> = serde_json::from_str(blob).map_err(ImportError::Parse)?;
        let count = imported.len();

        let mut combined = imported;
        combined.extend(self.sessions.iter().cloned());
        self.commit(combined).map_err(ImportError::Storage)?;

        debug!(count, "Imported chat sessions");
        Ok(count)
    }

    /// Persist `next` and only then make it the in-memory collection.
    fn commit(&mut self, next: Vec<ChatSession>) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), CHATS_KEY, &next)?;
        self.sessions = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
