use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use logai_core::ProgressState;
use logai_logging::{logai_debug, logai_info};
use thiserror::Error;

use crate::session::{RenderSink, SessionDriver};
use crate::{ClientSettings, EngineEvent, LogFile, ServiceClient, SessionError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] SessionError),
    #[error("engine worker stopped")]
    Disconnected,
}

enum EngineCommand {
    Analyze {
        file: Option<LogFile>,
        auth_token: Option<String>,
    },
    Cancel,
    FetchHistory {
        auth_token: Option<String>,
    },
    CheckHealth,
}

/// Forwards every rendered snapshot to the engine's event channel.
struct ChannelRenderSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl RenderSink for ChannelRenderSink {
    fn render(&self, state: &ProgressState) {
        let _ = self.tx.send(EngineEvent::Progress(state.clone()));
    }
}

/// Owns a worker thread with its own tokio runtime. Callers send commands and
/// poll events; nothing on the caller's side needs to be async.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let client = Arc::new(ServiceClient::new(settings)?);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("logai-engine")
            .build()?;

        thread::spawn(move || {
            let sink = Arc::new(ChannelRenderSink {
                tx: event_tx.clone(),
            });
            let driver = SessionDriver::new(client.clone(), sink, runtime.handle().clone());
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &driver, &client, command, &event_tx);
            }
            logai_debug!("engine command channel closed, shutting down");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    /// Starts an analysis, superseding any running one. A missing file is
    /// reported as `SessionRejected` without touching the network.
    pub fn analyze(&self, file: Option<LogFile>, auth_token: Option<String>) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::Analyze { file, auth_token });
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel);
    }

    pub fn fetch_history(&self, auth_token: Option<String>) {
        let _ = self.cmd_tx.send(EngineCommand::FetchHistory { auth_token });
    }

    pub fn check_health(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CheckHealth);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time; an error means the worker is gone and nothing ever
    /// will.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    driver: &SessionDriver,
    client: &Arc<ServiceClient>,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Analyze { file, auth_token } => {
            let file_name = file.as_ref().map(|file| file.name().to_string());
            match driver.start_session(file, auth_token) {
                Ok(handle) => {
                    let session_id = handle.id();
                    let _ = event_tx.send(EngineEvent::SessionStarted {
                        session_id,
                        file_name: file_name.unwrap_or_default(),
                    });
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        let state = handle.finished().await;
                        let _ = event_tx.send(EngineEvent::SessionFinished { session_id, state });
                    });
                }
                Err(err) => {
                    logai_info!("analysis rejected: {}", err);
                    let _ = event_tx.send(EngineEvent::SessionRejected(err));
                }
            }
        }
        EngineCommand::Cancel => {
            if driver.cancel_active().is_none() {
                logai_debug!("cancel requested with no active session");
            }
        }
        EngineCommand::FetchHistory { auth_token } => {
            let client = client.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = client.fetch_history(auth_token.as_deref()).await;
                let _ = event_tx.send(EngineEvent::HistoryLoaded(result));
            });
        }
        EngineCommand::CheckHealth => {
            let client = client.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = client.check_health().await;
                let _ = event_tx.send(EngineEvent::HealthChecked(result));
            });
        }
    }
}
