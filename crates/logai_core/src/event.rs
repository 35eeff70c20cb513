use serde::Deserialize;

/// Stage name carried by one server-pushed event.
///
/// Stage names outside the known set decode to [`EventStage::Unknown`] so a
/// newer server can add stages without breaking older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStage {
    Preprocessing,
    Preprocessed,
    Chunking,
    Analyzing,
    ChunkDone,
    Synthesizing,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

/// Partial statistics record; absent fields leave the accumulated value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct StatsPatch {
    #[serde(default)]
    pub total_lines: Option<u64>,
    #[serde(default)]
    pub critical: Option<u64>,
    #[serde(default)]
    pub errors: Option<u64>,
    #[serde(default)]
    pub warnings: Option<u64>,
}

/// One decoded `data: {...}` frame of the analysis stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamEvent {
    pub stage: EventStage,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stats: Option<StatsPatch>,
    #[serde(default)]
    pub chunk_index: Option<u32>,
    #[serde(default)]
    pub total_chunks: Option<u32>,
    #[serde(default)]
    pub result: Option<String>,
}

impl StreamEvent {
    pub fn new(stage: EventStage) -> Self {
        Self {
            stage,
            message: None,
            stats: None,
            chunk_index: None,
            total_chunks: None,
            result: None,
        }
    }

    /// Terminal error event, used by the session driver to fold transport
    /// and status failures into the same transition the server uses.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventStage::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_stats(mut self, stats: StatsPatch) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_chunk(mut self, chunk_index: u32, total_chunks: u32) -> Self {
        self.chunk_index = Some(chunk_index);
        self.total_chunks = Some(total_chunks);
        self
    }

    pub fn with_total_chunks(mut self, total_chunks: u32) -> Self {
        self.total_chunks = Some(total_chunks);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}
