use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use logai_core::{reduce, ProgressState, StreamEvent};
use logai_logging::{logai_debug, logai_error, logai_info, logai_warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::frames::FrameParser;
use crate::{LogFile, SessionError, SessionId, Uploader};

/// Failure recorded when the body closes before a `complete` or `error` frame.
pub const STREAM_ENDED_EARLY: &str = "analysis stream ended before completion";

/// Receives every progress snapshot of the active session, in order.
///
/// Renders are called with the driver's state lock released, so a sink may
/// read [`SessionDriver::snapshot`]. Starting or cancelling a session from
/// inside `render` is not supported.
pub trait RenderSink: Send + Sync {
    fn render(&self, state: &ProgressState);
}

struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Shared {
    active: Option<ActiveSession>,
    state: ProgressState,
}

/// Runs upload-and-analyze sessions one at a time.
///
/// Starting a session cancels the previous one. The "still active?" check and
/// the state update happen under the same lock, so a cancelled session can
/// never touch the shared state or render after its successor started.
#[derive(Clone)]
pub struct SessionDriver {
    uploader: Arc<dyn Uploader>,
    sink: Arc<dyn RenderSink>,
    runtime: Handle,
    shared: Arc<Mutex<Shared>>,
    // Serializes state updates with their renders, so renders stay in order.
    render_gate: Arc<Mutex<()>>,
    next_id: Arc<AtomicU64>,
}

impl SessionDriver {
    pub fn new(uploader: Arc<dyn Uploader>, sink: Arc<dyn RenderSink>, runtime: Handle) -> Self {
        Self {
            uploader,
            sink,
            runtime,
            shared: Arc::new(Mutex::new(Shared::default())),
            render_gate: Arc::new(Mutex::new(())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current progress of the most recently started session.
    pub fn snapshot(&self) -> ProgressState {
        self.lock().state.clone()
    }

    /// Starts a new session, cancelling any session still in flight.
    ///
    /// Fails before any network activity when no file is given. Otherwise the
    /// session runs on the driver's runtime and its handle resolves to the
    /// final state, whatever happens on the wire.
    pub fn start_session(
        &self,
        file: Option<LogFile>,
        auth_token: Option<String>,
    ) -> Result<SessionHandle, SessionError> {
        let file = file.ok_or(SessionError::NoFile)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();

        {
            let _gate = self.render_gate();
            let fresh = {
                let mut shared = self.lock();
                let prior = shared.active.replace(ActiveSession {
                    id,
                    cancel: cancel.clone(),
                });
                if let Some(prior) = prior {
                    if !prior.cancel.is_cancelled() {
                        logai_info!("session {} superseded by session {}", prior.id, id);
                    }
                    prior.cancel.cancel();
                }
                shared.state = ProgressState::new();
                shared.state.clone()
            };
            self.sink.render(&fresh);
        }

        logai_info!(
            "session {} started: file={} bytes={} auth={}",
            id,
            file.name(),
            file.len(),
            auth_token.is_some()
        );
        let driver = self.clone();
        let task_cancel = cancel.clone();
        let join = self
            .runtime
            .spawn(async move { driver.run(id, task_cancel, file, auth_token).await });

        Ok(SessionHandle { id, cancel, join })
    }

    /// Cancels the active session, if any, and returns its id.
    pub fn cancel_active(&self) -> Option<SessionId> {
        let _gate = self.render_gate();
        let shared = self.lock();
        let active = shared.active.as_ref()?;
        if active.cancel.is_cancelled() {
            return None;
        }
        active.cancel.cancel();
        logai_info!("session {} cancelled", active.id);
        Some(active.id)
    }

    async fn run(
        self,
        id: SessionId,
        cancel: CancellationToken,
        file: LogFile,
        auth_token: Option<String>,
    ) -> ProgressState {
        let mut last = ProgressState::new();

        let upload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                logai_debug!("session {} cancelled before the upload completed", id);
                return last;
            }
            result = self.uploader.upload(&file, auth_token.as_deref()) => result,
        };
        let mut stream = match upload {
            Ok(stream) => stream,
            Err(err) => {
                logai_warn!("session {} failed to start streaming: {}", id, err);
                self.apply(id, &cancel, &mut last, &StreamEvent::error(err.to_string()));
                return last;
            }
        };

        let mut parser = FrameParser::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    logai_debug!("session {} stopped reading after cancellation", id);
                    break;
                }
                next = stream.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    for event in parser.push(&chunk) {
                        if !self.apply(id, &cancel, &mut last, &event) {
                            return last;
                        }
                    }
                }
                Some(Err(err)) => {
                    logai_error!("session {} stream failed: {}", id, err);
                    self.apply(id, &cancel, &mut last, &StreamEvent::error(err.to_string()));
                    return last;
                }
                None => break,
            }
        }

        if parser.dropped_frames() > 0 {
            logai_warn!(
                "session {} dropped {} malformed frames",
                id,
                parser.dropped_frames()
            );
        }
        parser.finish();

        if !last.is_terminal() && !cancel.is_cancelled() {
            logai_warn!("session {} stream closed before a final event", id);
            self.apply(id, &cancel, &mut last, &StreamEvent::error(STREAM_ENDED_EARLY));
        }
        logai_info!(
            "session {} ended at {:?} ({}%)",
            id,
            last.current_stage(),
            last.percent()
        );
        last
    }

    /// Reduces `event` into the shared state if `id` is still the live
    /// session, then renders the result. Returns false once the session has
    /// been cancelled.
    fn apply(
        &self,
        id: SessionId,
        cancel: &CancellationToken,
        last: &mut ProgressState,
        event: &StreamEvent,
    ) -> bool {
        let _gate = self.render_gate();
        {
            let mut shared = self.lock();
            let is_live = !cancel.is_cancelled()
                && shared
                    .active
                    .as_ref()
                    .is_some_and(|active| active.id == id);
            if !is_live {
                return false;
            }
            shared.state = reduce(std::mem::take(&mut shared.state), event);
            *last = shared.state.clone();
        }
        self.sink.render(last);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_gate(&self) -> MutexGuard<'_, ()> {
        self.render_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caller's view of one running session.
pub struct SessionHandle {
    id: SessionId,
    cancel: CancellationToken,
    join: JoinHandle<ProgressState>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Stops the session at its next chunk boundary. Latched; cannot be undone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the session to end. Always yields a state: a cancelled
    /// session yields the last state it produced.
    pub async fn finished(self) -> ProgressState {
        match self.join.await {
            Ok(state) => state,
            Err(err) => {
                logai_error!("session {} task ended abnormally: {}", self.id, err);
                reduce(
                    ProgressState::new(),
                    &StreamEvent::error(format!("session ended unexpectedly: {err}")),
                )
            }
        }
    }
}
