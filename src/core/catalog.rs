//! Service catalog.
//!
//! Built-in service descriptors ship inside the binary (`builtins/catalog.toml`).
//! User-added test entries are appended to a storage document and picked up
//! the next time the catalog is loaded.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::storage::{write_json, Storage, StorageError, TEST_SERVICES_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
    Maintenance,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Online => "online",
            ServiceStatus::Offline => "offline",
            ServiceStatus::Maintenance => "maintenance",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionDetails {
    Sse {
        url: String,
    },
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl fmt::Display for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDetails::Sse { url } => write!(f, "sse {url}"),
            ConnectionDetails::Stdio { command, args } if args.is_empty() => {
                write!(f, "stdio {command}")
            }
            ConnectionDetails::Stdio { command, args } => {
                write!(f, "stdio {command} {}", args.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    pub keywords: Vec<String>,
    pub response: String,
}

impl MockResponse {
    /// Case-insensitive substring match of any keyword against `content`.
    pub fn matches(&self, content: &str) -> bool {
        let lowercase = content.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| lowercase.contains(&keyword.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(rename = "type", default)]
    pub category: String,
    pub status: ServiceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub connection_details: ConnectionDetails,
    #[serde(default)]
    pub sample_questions: Vec<String>,
    #[serde(default)]
    pub mock_responses: Vec<MockResponse>,
}

impl Service {
    pub fn find_mock_response(&self, content: &str) -> Option<&MockResponse> {
        self.mock_responses.iter().find(|r| r.matches(content))
    }

    fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
    }
}

#[derive(Deserialize)]
struct BuiltinCatalog {
    services: Vec<Service>,
}

/// Load the service descriptors embedded in the binary.
pub fn load_builtin_services() -> Vec<Service> {
    const CATALOG_CONTENT: &str = include_str!("../builtins/catalog.toml");

    match toml::from_str::<BuiltinCatalog>(CATALOG_CONTENT) {
        Ok(catalog) => catalog.services,
        Err(err) => {
            warn!(error = %err, "Failed to parse built-in catalog");
            Vec::new()
        }
    }
}

pub struct Catalog {
    services: Vec<Service>,
}

impl Catalog {
    pub fn new(services: Vec<Service>) -> Self {
        Self { services }
    }

    /// Built-in entries followed by the stored test entries.
    pub fn load(storage: &dyn Storage) -> Result<Self, StorageError> {
        let mut services = load_builtin_services();
        let test_entries = read_test_entries(storage)?;
        debug!(
            builtin = services.len(),
            test = test_entries.len(),
            "Loaded service catalog"
        );
        services.extend(test_entries);
        Ok(Self { services })
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn find(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Services whose name, description or tags contain `query`, ignoring case.
    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a Service> {
        self.services
            .iter()
            .filter(move |s| query.is_empty() || s.matches_query(query))
    }
}

fn read_test_entries(storage: &dyn Storage) -> Result<Vec<Service>, StorageError> {
    let Some(raw) = storage.get_item(TEST_SERVICES_KEY)? else {
        return Ok(Vec::new());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(error = %err, "Ignoring malformed test service entries");
        Vec::new()
    }))
}

/// Append a user-defined test entry to storage. The entry becomes visible on
/// the next [`Catalog::load`].
pub fn add_test_entry(
    storage: &Arc<dyn Storage>,
    name: &str,
    connection_details: ConnectionDetails,
) -> Result<Service, StorageError> {
    let service = Service {
        id: format!("test-{}", Utc::now().timestamp_millis()),
        name: name.to_string(),
        description: "Test MCP Server".to_string(),
        github: None,
        category: "test".to_string(),
        status: ServiceStatus::Online,
        tags: vec!["test".to_string()],
        connection_details,
        sample_questions: Vec::new(),
        mock_responses: Vec::new(),
    };

    let mut entries = read_test_entries(storage.as_ref())?;
    entries.push(service.clone());
    write_json(storage.as_ref(), TEST_SERVICES_KEY, &entries)?;
    debug!(service_id = %service.id, "Added test service entry");
    Ok(service)
}
