use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::backend::BackendMode;

/// Timing of the simulated services.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MockConfig {
    /// Delay before a probe answers and before a reply starts streaming.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    #[serde(default = "default_chunk_delay_min_ms")]
    pub chunk_delay_min_ms: u64,
    #[serde(default = "default_chunk_delay_max_ms")]
    pub chunk_delay_max_ms: u64,
}

fn default_latency_ms() -> u64 {
    500
}

fn default_chunk_delay_min_ms() -> u64 {
    50
}

fn default_chunk_delay_max_ms() -> u64 {
    150
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            chunk_delay_min_ms: default_chunk_delay_min_ms(),
            chunk_delay_max_ms: default_chunk_delay_max_ms(),
        }
    }
}

impl MockConfig {
    /// No artificial delays at all.
    pub fn instant() -> Self {
        Self {
            latency_ms: 0,
            chunk_delay_min_ms: 0,
            chunk_delay_max_ms: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Directory holding the stored documents (settings, chats, test entries)
    pub data_dir: Option<PathBuf>,
    /// Which backend answers chat messages ("mock" or "live")
    pub backend: Option<BackendMode>,
    pub mock: Option<MockConfig>,
    /// Per-provider API base URL overrides, keyed by provider id
    #[serde(default)]
    pub base_urls: HashMap<String, String>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn backend_mode(&self) -> BackendMode {
        self.backend.unwrap_or_default()
    }

    pub fn base_url_override(&self, provider_id: &str) -> Option<&str> {
        self.base_urls
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(provider_id))
            .map(|(_, url)| url.as_str())
    }
}
