pub mod attachment;
pub mod backend;
pub mod capabilities;
pub mod catalog;
pub mod chat_stream;
pub mod client;
pub mod config;
pub mod i18n;
pub mod message;
pub mod mock;
pub mod providers;
pub mod session_sync;
pub mod sessions;
pub mod settings;
pub mod storage;
