//! URL helpers for provider endpoints and test service addresses.

use reqwest::Url;

/// Strip trailing slashes so endpoints can be appended safely.
///
/// ```
/// use mcp_explorer::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8080/v1/"), "http://localhost:8080/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a provider base URL and an endpoint path with exactly one slash.
///
/// ```
/// use mcp_explorer::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.deepseek.com/v1/", "/chat/completions"),
///     "https://api.deepseek.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

/// Check that an SSE service address is an absolute http(s) URL.
pub fn validate_service_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|err| format!("Invalid URL '{raw}': {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!(
            "Unsupported URL scheme '{other}'; expected http or https"
        )),
    }
}
