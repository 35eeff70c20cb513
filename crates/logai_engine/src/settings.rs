use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Where the analysis service lives and how patient the transport is.
///
/// There is no overall request timeout by default: an analysis stream can
/// legitimately run for minutes, and a session only ends on completion,
/// transport failure or cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub analyze_path: String,
    pub history_path: String,
    pub health_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            analyze_path: "/analyze-stream".to_string(),
            history_path: "/history".to_string(),
            health_path: "/health".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

impl ClientSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Joins `path` onto the base URL, keeping any path prefix of the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
