use super::*;
use crate::core::storage::{FileStorage, MemoryStorage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

fn memory_store() -> (Arc<dyn Storage>, SessionStore) {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let store = SessionStore::load(storage.clone()).expect("load failed");
    (storage, store)
}

fn exchange(question: &str, answer: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(question), ChatMessage::assistant(answer)]
}

#[test]
fn create_prepends_and_assigns_unique_ids() {
    let (_, mut store) = memory_store();
    let first = store.create("legal-advisor", "First...").unwrap();
    let second = store.create("legal-advisor", "Second...").unwrap();

    assert_ne!(first, second);
    assert_eq!(store.list()[0].id, second);
    assert_eq!(store.list()[1].id, first);
    assert!(store.get(&first).unwrap().messages.is_empty());
    assert_eq!(store.get(&first).unwrap().last_message, "");
}

#[test]
fn update_writes_messages_preview_and_timestamp() {
    let (storage, mut store) = memory_store();
    let id = store.create("tax-consultant", "VAT...").unwrap();
    let messages = exchange("What is the VAT rate?", "18%");

    assert!(store.update(&id, &messages).unwrap());
    let session = store.get(&id).unwrap();
    assert_eq!(session.messages, messages);
    assert_eq!(session.last_message, "18%");

    let reloaded = SessionStore::load(storage).unwrap();
    assert_eq!(reloaded.get(&id).unwrap().messages, messages);
}

#[test]
fn unchanged_updates_do_not_touch_the_collection() {
    let (storage, mut store) = memory_store();
    let id = store.create("legal-advisor", "Hi...").unwrap();
    let messages = exchange("hola", "buenas");
    store.update(&id, &messages).unwrap();

    let snapshot = store.list().to_vec();
    let raw_before = storage.get_item(CHATS_KEY).unwrap();

    for _ in 0..3 {
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(!store.update(&id, &messages).unwrap());
    }

    assert_eq!(store.list(), snapshot.as_slice());
    assert_eq!(storage.get_item(CHATS_KEY).unwrap(), raw_before);
}

#[test]
fn update_of_unknown_session_is_ignored() {
    let (storage, mut store) = memory_store();
    assert!(!store.update("missing", &exchange("a", "b")).unwrap());
    assert!(store.list().is_empty());
    assert_eq!(storage.get_item(CHATS_KEY).unwrap(), None);
}

#[test]
fn create_then_delete_restores_previous_state() {
    let (_, mut store) = memory_store();
    let existing = store.create("legal-advisor", "Keep...").unwrap();
    store.update(&existing, &exchange("q", "a")).unwrap();
    let before = store.list().to_vec();

    let id = store.create("tax-consultant", "Temp...").unwrap();
    assert!(store.delete(&id).unwrap());

    assert_eq!(store.list(), before.as_slice());
    assert!(!store.delete(&id).unwrap());
}

#[test]
fn clear_removes_everything() {
    let (storage, mut store) = memory_store();
    store.create("a", "A...").unwrap();
    store.create("b", "B...").unwrap();
    store.clear().unwrap();

    assert!(store.list().is_empty());
    assert_eq!(storage.get_item(CHATS_KEY).unwrap().as_deref(), Some("[]"));
}

/// Memory storage whose writes can be switched off.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_writes: AtomicBool,
}

impl Storage for FlakyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                path: PathBuf::from(format!("{key}.json")),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key)
    }
}

#[test]
fn failed_writes_leave_memory_matching_disk() {
    let flaky = Arc::new(FlakyStorage::default());
    let storage: Arc<dyn Storage> = flaky.clone();
    let mut store = SessionStore::load(storage.clone()).unwrap();
    let id = store.create("legal-advisor", "business...").unwrap();
    store.update(&id, &exchange("business", "Para registrar")).unwrap();
    let before = store.list().to_vec();

    flaky.fail_writes.store(true, Ordering::SeqCst);
    assert!(store.create("tax-consultant", "itbis...").is_err());
    assert!(store.update(&id, &exchange("divorce", "Para divorciarse")).is_err());
    assert!(store.delete(&id).is_err());
    assert!(store.clear().is_err());
    assert_eq!(store.list(), before.as_slice());

    let reloaded = SessionStore::load(storage).unwrap();
    assert_eq!(reloaded.list(), before.as_slice());
}

#[test]
fn export_then_import_into_empty_store_round_trips() {
    let (_, mut source) = memory_store();
    let a = source.create("legal-advisor", "A...").unwrap();
    source.update(&a, &exchange("business registration", "ONAPI")).unwrap();
    let b = source.create("tax-consultant", "B...").unwrap();
    source.update(&b, &exchange("itbis", "18%")).unwrap();

    let blob = source.export();

    let (_, mut target) = memory_store();
    assert_eq!(target.import(&blob).unwrap(), 2);
    assert_eq!(target.list(), source.list());
}

#[test]
fn import_into_non_empty_store_prepends_and_may_duplicate() {
    let (_, mut store) = memory_store();
    let id = store.create("legal-advisor", "A...").unwrap();
    let blob = store.export();

    assert_eq!(store.import(&blob).unwrap(), 1);
    assert_eq!(store.list().len(), 2);
    assert!(store.list().iter().all(|s| s.id == id));

    assert!(store.delete(&id).unwrap());
    assert!(store.list().is_empty());
}

#[test]
fn import_of_non_json_fails_and_leaves_collection_untouched() {
    let (storage, mut store) = memory_store();
    let id = store.create("legal-advisor", "A...").unwrap();
    let before = store.list().to_vec();
    let raw_before = storage.get_item(CHATS_KEY).unwrap();

    let err = store.import("this is not json").unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
    assert_eq!(store.list(), before.as_slice());
    assert_eq!(storage.get_item(CHATS_KEY).unwrap(), raw_before);

    assert!(matches!(
        store.import(r#"{"id":"1"}"#),
        Err(ImportError::Parse(_))
    ));
    assert!(store.get(&id).is_some());
}

#[test]
fn malformed_stored_document_loads_as_empty() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    storage.set_item(CHATS_KEY, "[{broken").unwrap();
    let store = SessionStore::load(storage).unwrap();
    assert!(store.list().is_empty());
}

#[test]
fn stored_document_uses_camel_case_fields() {
    let (storage, mut store) = memory_store();
    store.create("legal-advisor", "Hola...").unwrap();
    let raw = storage.get_item(CHATS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let session = &value[0];
    assert_eq!(session["mcpId"], "legal-advisor");
    assert_eq!(session["lastMessage"], "");
    assert!(session["timestamp"].is_i64());
    assert!(session["messages"].as_array().unwrap().is_empty());
}

#[test]
fn sessions_survive_file_storage_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(temp_dir.path()));
    let mut store = SessionStore::load(storage.clone()).unwrap();
    let id = store.create("immigration-advisor", "Visa...").unwrap();
    store.update(&id, &exchange("visa", "ok")).unwrap();

    let reloaded = SessionStore::load(storage).unwrap();
    assert_eq!(reloaded.list(), store.list());
    assert_eq!(reloaded.sessions_for("immigration-advisor").count(), 1);
    assert_eq!(reloaded.sessions_for("legal-advisor").count(), 0);
}

#[test]
fn preview_truncates_long_messages() {
    let long = "a".repeat(60);
    assert_eq!(preview(&[ChatMessage::user(long)]), format!("{}...", "a".repeat(50)));
    assert_eq!(preview(&[ChatMessage::user("short")]), "short");
    assert_eq!(preview(&[]), "");

    let accented = "é".repeat(50);
    assert_eq!(preview(&[ChatMessage::user(accented.clone())]), accented);
}

#[test]
fn title_uses_first_five_words() {
    assert_eq!(
        derive_title("How do I register a business here?"),
        "How do I register a..."
    );
    assert_eq!(derive_title("itbis"), "itbis...");
}

#[test]
fn export_file_name_uses_iso_date() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(export_file_name(date), "mcp-chats-2024-03-09.json");
}
