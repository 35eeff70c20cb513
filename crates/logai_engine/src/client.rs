use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use logai_core::HistoryRecord;
use logai_logging::{logai_debug, logai_warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;

use crate::{ClientSettings, HealthStatus, LogFile, SessionError};

/// Multipart field the service reads the upload from.
pub const UPLOAD_FIELD: &str = "file";

/// Body of a successful upload, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, SessionError>>;

/// Transport seam for starting an analysis.
///
/// Implementations resolve status failures themselves: a returned stream is
/// always the body of a successful response.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        file: &LogFile,
        auth_token: Option<&str>,
    ) -> Result<ByteStream, SessionError>;
}

/// HTTP client for the analysis service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(settings: ClientSettings) -> Result<Self, SessionError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(map_reqwest_error)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Past analyses for the signed-in user. `null` and `[]` both mean none.
    pub async fn fetch_history(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<HistoryRecord>, SessionError> {
        let url = self.url(&self.settings.history_path)?;
        let mut request = self.client.get(url);
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let records: Option<Vec<HistoryRecord>> = serde_json::from_slice(&body)
            .map_err(|err| SessionError::InvalidResponse(format!("history: {err}")))?;
        Ok(records.unwrap_or_default())
    }

    pub async fn check_health(&self) -> Result<HealthStatus, SessionError> {
        let url = self.url(&self.settings.health_path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| SessionError::InvalidResponse(format!("health: {err}")))
    }

    fn url(&self, path: &str) -> Result<Url, SessionError> {
        let raw = self.settings.endpoint(path);
        Url::parse(&raw).map_err(|err| SessionError::InvalidUrl {
            url: raw,
            message: err.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Uploader for ServiceClient {
    async fn upload(
        &self,
        file: &LogFile,
        auth_token: Option<&str>,
    ) -> Result<ByteStream, SessionError> {
        let url = self.url(&self.settings.analyze_path)?;
        let part = Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string())
            .mime_str("text/plain")
            .map_err(map_reqwest_error)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let mut request = self.client.post(url).multipart(form);
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        logai_debug!(
            "upload of {} accepted, streaming analysis from {}",
            file.name(),
            response.url()
        );

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// 401 means stale credentials and is never retried; any other failure
/// status carries its message in the JSON body when the body is readable.
async fn check_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        logai_warn!("{} rejected credentials (401)", response.url());
        return Err(SessionError::Expired);
    }
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.bytes().await {
        Ok(body) => error_message_from_body(&body),
        Err(err) => {
            logai_debug!("could not read error body: {}", err);
            None
        }
    }
    .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16()));
    logai_warn!("request failed with HTTP {}: {}", status.as_u16(), message);

    Err(SessionError::Server {
        status: status.as_u16(),
        message,
    })
}

fn error_message_from_body(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    if let Some(error) = parsed.error.filter(|error| !error.trim().is_empty()) {
        return Some(error);
    }
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        serde_json::Value::Null | serde_json::Value::String(_) => None,
        // Validation failures carry a structured detail list.
        other => Some(other.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        return SessionError::Transport(format!("request timed out: {err}"));
    }
    SessionError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::error_message_from_body;

    #[test]
    fn prefers_error_field() {
        let body = br#"{"error":"Please upload a .txt file","detail":"ignored"}"#;
        assert_eq!(
            error_message_from_body(body).as_deref(),
            Some("Please upload a .txt file")
        );
    }

    #[test]
    fn falls_back_to_detail() {
        assert_eq!(
            error_message_from_body(br#"{"detail":"Invalid token"}"#).as_deref(),
            Some("Invalid token")
        );
        let structured = error_message_from_body(br#"{"detail":[{"msg":"field required"}]}"#)
            .expect("structured detail");
        assert!(structured.contains("field required"));
    }

    #[test]
    fn unreadable_body_yields_none() {
        assert_eq!(error_message_from_body(b"<html>Bad Gateway</html>"), None);
        assert_eq!(error_message_from_body(br#"{"unrelated":1}"#), None);
        assert_eq!(error_message_from_body(br#"{"error":"  "}"#), None);
    }
}
