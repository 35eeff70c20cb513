use crate::event::StatsPatch;
use crate::view_model::ProgressView;

/// Coarse phase of one analysis session, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Preprocess,
    Analyze,
    Synthesize,
    Complete,
    Error,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }
}

/// Log statistics reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total_lines: u64,
    pub critical: u64,
    pub errors: u64,
    pub warnings: u64,
}

impl Stats {
    /// Overwrites only the fields present in `patch`.
    pub fn merge(&mut self, patch: &StatsPatch) {
        if let Some(value) = patch.total_lines {
            self.total_lines = value;
        }
        if let Some(value) = patch.critical {
            self.critical = value;
        }
        if let Some(value) = patch.errors {
            self.errors = value;
        }
        if let Some(value) = patch.warnings {
            self.warnings = value;
        }
    }
}

/// One per-chunk analysis result, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry {
    pub index: u32,
    pub total: u32,
    pub content: String,
}

/// Accumulated progress of one session.
///
/// Fields are only written by [`crate::reduce`]; everything else reads
/// snapshots through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub(crate) current_stage: Stage,
    pub(crate) percent: u8,
    pub(crate) status_message: String,
    pub(crate) stats: Stats,
    pub(crate) partial_chunks: Vec<ChunkEntry>,
    pub(crate) final_result: Option<String>,
    pub(crate) failure: Option<String>,
    pub(crate) total_chunks: Option<u32>,
    pub(crate) current_chunk: Option<u32>,
    pub(crate) failed_during: Option<Stage>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ProgressView {
        ProgressView::from(self)
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn partial_chunks(&self) -> &[ChunkEntry] {
        &self.partial_chunks
    }

    pub fn final_result(&self) -> Option<&str> {
        self.final_result.as_deref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn total_chunks(&self) -> Option<u32> {
        self.total_chunks
    }

    pub fn current_chunk(&self) -> Option<u32> {
        self.current_chunk
    }

    /// Stage that was active when the session failed, if it failed.
    pub fn failed_during(&self) -> Option<Stage> {
        self.failed_during
    }

    pub fn is_terminal(&self) -> bool {
        self.current_stage.is_terminal()
    }

    /// Percent only ever ratchets upward within a session.
    pub(crate) fn raise_percent(&mut self, floor: u8) {
        self.percent = self.percent.max(floor.min(100));
    }
}
