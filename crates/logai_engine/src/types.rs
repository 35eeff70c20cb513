use std::fs;
use std::io;
use std::path::Path;

use bytes::Bytes;
use logai_core::{HistoryRecord, ProgressState};
use serde::Deserialize;

pub type SessionId = u64;

/// A log file selected for upload: its display name and raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    name: String,
    contents: Bytes,
}

impl LogFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Reads the whole file; the upload name is the path's final component.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let contents = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.txt".to_string());
        Ok(Self::new(name, contents))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Why a session could not start or ended in the `error` stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no log file selected")]
    NoFile,
    #[error("session expired, please re-authenticate")]
    Expired,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("connection error: {0}")]
    Transport(String),
    #[error("invalid server url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("unexpected response from server: {0}")]
    InvalidResponse(String),
}

impl SessionError {
    /// True when the user has to sign in again before retrying.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, SessionError::Expired)
    }
}

/// Body of the service health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub google_api_key_configured: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SessionStarted {
        session_id: SessionId,
        file_name: String,
    },
    /// The session never started (e.g. no file).
    SessionRejected(SessionError),
    Progress(ProgressState),
    SessionFinished {
        session_id: SessionId,
        state: ProgressState,
    },
    HistoryLoaded(Result<Vec<HistoryRecord>, SessionError>),
    HealthChecked(Result<HealthStatus, SessionError>),
}
