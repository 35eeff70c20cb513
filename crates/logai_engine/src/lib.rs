//! LogAI engine: upload, stream decoding, session lifecycle and report IO.
mod auth;
mod client;
mod engine;
mod filename;
mod frames;
mod persist;
mod session;
mod settings;
mod types;

pub use auth::{AccessTokenProvider, AuthError, StaticTokenProvider};
pub use client::{ByteStream, ServiceClient, Uploader, UPLOAD_FIELD};
pub use engine::{EngineError, EngineHandle};
pub use filename::report_filename;
pub use frames::{FrameParser, DATA_PREFIX};
pub use persist::{ensure_report_dir, save_report, PersistError, ReportStore};
pub use session::{RenderSink, SessionDriver, SessionHandle, STREAM_ENDED_EARLY};
pub use settings::{ClientSettings, DEFAULT_BASE_URL};
pub use types::{EngineEvent, HealthStatus, LogFile, SessionError, SessionId};
