use crate::{ChunkEntry, EventStage, ProgressState, Stage, StreamEvent};

/// Failure text used when an `error` event carries no message.
pub const DEFAULT_FAILURE: &str = "Analysis failed";

const ANALYZE_FLOOR: u64 = 25;
const ANALYZE_SPAN: u64 = 50;

/// Pure reducer: applies one stream event to the progress state.
pub fn reduce(mut state: ProgressState, event: &StreamEvent) -> ProgressState {
    match event.stage {
        EventStage::Preprocessing => {
            state.current_stage = Stage::Preprocess;
            state.raise_percent(10);
        }
        EventStage::Preprocessed => {
            state.raise_percent(20);
            if let Some(patch) = &event.stats {
                state.stats.merge(patch);
            }
        }
        EventStage::Chunking => {
            state.raise_percent(22);
            if let Some(total) = event.total_chunks {
                state.total_chunks = Some(total);
            }
        }
        EventStage::Analyzing => {
            state.current_stage = Stage::Analyze;
            if let Some(total) = event.total_chunks {
                state.total_chunks = Some(total);
            }
            if event.chunk_index.is_some() {
                state.current_chunk = event.chunk_index;
            }
            if let Some(percent) = analyzing_percent(event.chunk_index, event.total_chunks) {
                state.raise_percent(percent);
            }
        }
        EventStage::ChunkDone => {
            let index = event
                .chunk_index
                .unwrap_or(state.partial_chunks.len() as u32 + 1);
            let total = event.total_chunks.or(state.total_chunks).unwrap_or(0);
            state.partial_chunks.push(ChunkEntry {
                index,
                total,
                content: event.result.clone().unwrap_or_default(),
            });
        }
        EventStage::Synthesizing => {
            state.current_stage = Stage::Synthesize;
            state.raise_percent(80);
        }
        EventStage::Complete => {
            state.current_stage = Stage::Complete;
            state.raise_percent(100);
            // Earlier progress text no longer applies; a message below replaces it.
            state.status_message.clear();
            state.final_result = Some(event.result.clone().unwrap_or_default());
            if let Some(patch) = &event.stats {
                state.stats.merge(patch);
            }
        }
        EventStage::Error => {
            if state.current_stage != Stage::Error {
                state.failed_during = Some(state.current_stage);
            }
            state.current_stage = Stage::Error;
            state.status_message.clear();
            state.failure = Some(
                event
                    .message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
            );
            return state;
        }
        EventStage::Unknown => return state,
    }

    if let Some(message) = &event.message {
        state.status_message = message.clone();
    }
    state
}

/// `25 + index/total * 50`, clamped to `[25, 75]`; `None` when the total is
/// missing or zero.
fn analyzing_percent(chunk_index: Option<u32>, total_chunks: Option<u32>) -> Option<u8> {
    let total = u64::from(total_chunks.filter(|total| *total > 0)?);
    let index = u64::from(chunk_index.unwrap_or(0)).min(total);
    let percent = (ANALYZE_FLOOR + index * ANALYZE_SPAN / total)
        .clamp(ANALYZE_FLOOR, ANALYZE_FLOOR + ANALYZE_SPAN);
    Some(percent as u8)
}
