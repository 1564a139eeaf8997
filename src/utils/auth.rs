//! Authentication utilities for API requests
//!
//! This module adds provider-specific authentication headers to HTTP
//! requests.

use crate::core::providers::{AuthMode, Provider};

/// Add provider-specific authentication headers to an HTTP request
///
/// - Anthropic: `x-api-key` header with `anthropic-version`
/// - All others: standard `Authorization: Bearer` header
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    provider: Provider,
    api_key: &str,
) -> reqwest::RequestBuilder {
    match provider.auth_mode() {
        AuthMode::Anthropic => request
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01"),
        AuthMode::Bearer => request.header("Authorization", format!("Bearer {api_key}")),
    }
}
