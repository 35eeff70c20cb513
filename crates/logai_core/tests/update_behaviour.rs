use std::sync::Once;

use logai_core::{
    reduce, EventStage, ProgressState, Stage, Stats, StatsPatch, StreamEvent, DEFAULT_FAILURE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(logai_logging::initialize_for_tests);
}

fn apply(state: ProgressState, events: &[StreamEvent]) -> ProgressState {
    events.iter().fold(state, reduce)
}

fn full_stats() -> StatsPatch {
    StatsPatch {
        total_lines: Some(120),
        critical: Some(1),
        errors: Some(2),
        warnings: Some(5),
    }
}

fn happy_path() -> Vec<StreamEvent> {
    vec![
        StreamEvent::new(EventStage::Preprocessing).with_message("Preprocessing log file..."),
        StreamEvent::new(EventStage::Preprocessed)
            .with_stats(full_stats())
            .with_message("Preprocessed 120 lines"),
        StreamEvent::new(EventStage::Chunking).with_total_chunks(2),
        StreamEvent::new(EventStage::Analyzing).with_chunk(1, 2),
        StreamEvent::new(EventStage::ChunkDone)
            .with_chunk(1, 2)
            .with_result("first chunk"),
        StreamEvent::new(EventStage::Analyzing).with_chunk(2, 2),
        StreamEvent::new(EventStage::ChunkDone)
            .with_chunk(2, 2)
            .with_result("second chunk"),
        StreamEvent::new(EventStage::Synthesizing),
        StreamEvent::new(EventStage::Complete)
            .with_result("# Report")
            .with_stats(full_stats()),
    ]
}

#[test]
fn fresh_state_is_idle_at_zero() {
    let state = ProgressState::new();
    assert_eq!(state.current_stage(), Stage::Idle);
    assert_eq!(state.percent(), 0);
    assert!(state.partial_chunks().is_empty());
    assert_eq!(state.final_result(), None);
    assert_eq!(state.failure(), None);
}

#[test]
fn full_session_reaches_complete() {
    init_logging();
    let state = apply(ProgressState::new(), &happy_path());

    assert_eq!(state.current_stage(), Stage::Complete);
    assert_eq!(state.percent(), 100);
    assert_eq!(state.final_result(), Some("# Report"));
    assert_eq!(state.partial_chunks().len(), 2);
    assert_eq!(state.stats().total_lines, 120);
    assert_eq!(state.status_message(), "");
    assert_eq!(state.view().status, "Analysis complete");
    assert_eq!(
        *state.stats(),
        Stats {
            total_lines: 120,
            critical: 1,
            errors: 2,
            warnings: 5,
        }
    );
}

#[test]
fn percent_never_decreases_along_the_pipeline() {
    init_logging();
    let mut state = ProgressState::new();
    let mut seen = vec![state.percent()];
    for event in happy_path() {
        state = reduce(state, &event);
        seen.push(state.percent());
    }

    assert_eq!(seen, vec![0, 10, 20, 22, 50, 50, 75, 75, 80, 100]);
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn late_analyzing_event_does_not_pull_percent_back() {
    let state = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Synthesizing),
            StreamEvent::new(EventStage::Analyzing).with_chunk(1, 4),
        ],
    );

    assert_eq!(state.current_stage(), Stage::Analyze);
    assert_eq!(state.percent(), 80);
}

#[test]
fn analyzing_with_zero_total_keeps_percent() {
    let state = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Chunking),
            StreamEvent::new(EventStage::Analyzing).with_chunk(0, 0),
        ],
    );

    assert_eq!(state.current_stage(), Stage::Analyze);
    assert_eq!(state.percent(), 22);
}

#[test]
fn stats_merge_only_overwrites_present_fields() {
    let state = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Preprocessed).with_stats(full_stats()),
            StreamEvent::new(EventStage::Complete).with_stats(StatsPatch {
                errors: Some(9),
                ..StatsPatch::default()
            }),
        ],
    );

    assert_eq!(
        *state.stats(),
        Stats {
            total_lines: 120,
            critical: 1,
            errors: 9,
            warnings: 5,
        }
    );
}

#[test]
fn error_keeps_accumulated_stats_and_chunks() {
    init_logging();
    let before = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Preprocessing),
            StreamEvent::new(EventStage::Preprocessed).with_stats(full_stats()),
            StreamEvent::new(EventStage::Analyzing).with_chunk(1, 3),
            StreamEvent::new(EventStage::ChunkDone)
                .with_chunk(1, 3)
                .with_result("partial"),
        ],
    );

    let after = reduce(
        before.clone(),
        &StreamEvent::error("Rate limit hit. Please wait a minute and try again."),
    );

    assert_eq!(after.current_stage(), Stage::Error);
    assert_eq!(
        after.failure(),
        Some("Rate limit hit. Please wait a minute and try again.")
    );
    assert_eq!(after.failed_during(), Some(Stage::Analyze));
    assert_eq!(after.stats(), before.stats());
    assert_eq!(after.partial_chunks(), before.partial_chunks());
    assert_eq!(after.percent(), before.percent());
    assert_eq!(after.final_result(), None);
    assert_eq!(after.view().status, "Analysis failed");
}

#[test]
fn error_without_message_uses_default() {
    let state = reduce(ProgressState::new(), &StreamEvent::new(EventStage::Error));

    assert_eq!(state.current_stage(), Stage::Error);
    assert_eq!(state.failure(), Some(DEFAULT_FAILURE));
    assert_eq!(state.failed_during(), Some(Stage::Idle));
}

#[test]
fn status_message_tracks_latest_message() {
    let state = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Preprocessing).with_message("Preprocessing log file..."),
            StreamEvent::new(EventStage::Chunking)
                .with_total_chunks(3)
                .with_message("Split into 3 chunks for analysis"),
            StreamEvent::new(EventStage::Analyzing).with_chunk(1, 3),
        ],
    );

    assert_eq!(state.status_message(), "Split into 3 chunks for analysis");
    assert_eq!(state.total_chunks(), Some(3));
    assert_eq!(state.current_chunk(), Some(1));
}

#[test]
fn complete_message_replaces_progress_text() {
    let state = apply(
        ProgressState::new(),
        &[
            StreamEvent::new(EventStage::Synthesizing).with_message("Writing the final report"),
            StreamEvent::new(EventStage::Complete)
                .with_result("# Report")
                .with_message("Done"),
        ],
    );

    assert_eq!(state.status_message(), "Done");
}

#[test]
fn reducer_is_pure() {
    let state = apply(ProgressState::new(), &happy_path()[..3]);
    let event = StreamEvent::new(EventStage::Analyzing).with_chunk(1, 2);

    let first = reduce(state.clone(), &event);
    let second = reduce(state.clone(), &event);

    assert_eq!(first, second);
    assert_eq!(state.current_stage(), Stage::Preprocess);
}
