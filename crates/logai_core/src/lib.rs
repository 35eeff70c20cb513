//! LogAI core: pure progress reducer, stream event model and view-model helpers.
mod event;
mod history;
mod state;
mod update;
mod view_model;

pub use event::{EventStage, StatsPatch, StreamEvent};
pub use history::{
    format_created_at, HistoryRecord, HistoryRow, HistoryView, RecordId, AUTH_REQUIRED_MESSAGE,
    NO_SUMMARY, UNKNOWN_DATE, UNTITLED_FILE,
};
pub use state::{ChunkEntry, ProgressState, Stage, Stats};
pub use update::{reduce, DEFAULT_FAILURE};
pub use view_model::{
    format_with_commas, stage_label, ChunkPanel, ProgressView, StatCounter, StepStatus, StepView,
    PIPELINE_STEPS,
};
