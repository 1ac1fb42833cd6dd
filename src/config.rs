use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::error::Result;

/// Construction-time settings shared by both client variants.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the configuration service, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Extra headers merged over the default `Content-Type: application/json`
    pub headers: Vec<(String, String)>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            headers: Vec::new(),
            timeout_seconds: 30,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Build the full URL for a service path like `config/display`.
    ///
    /// A trailing slash on the base URL is tolerated so that
    /// `http://host/api` and `http://host/api/` produce the same result.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Default header set merged with the caller's extras.
    ///
    /// Invalid header names or values are skipped rather than failing client
    /// construction; a warning is logged for each.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            let parsed_name = match name.parse::<HeaderName>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(header = %name, "skipping invalid header name");
                    continue;
                }
            };
            let parsed_value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(header = %name, "skipping invalid header value");
                    continue;
                }
            };
            map.insert(parsed_name, parsed_value);
        }

        Ok(map)
    }
}
