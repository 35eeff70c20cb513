use crate::{ProgressState, Stage};

/// Steps shown in the stage indicator, in pipeline order.
pub const PIPELINE_STEPS: [Stage; 4] = [
    Stage::Preprocess,
    Stage::Analyze,
    Stage::Synthesize,
    Stage::Complete,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub stage: Stage,
    pub label: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCounter {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPanel {
    pub title: String,
    pub content: String,
}

/// Plain-data snapshot handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub stage: Stage,
    pub percent: u8,
    pub status: String,
    pub steps: Vec<StepView>,
    pub counters: Vec<StatCounter>,
    pub chunk_label: Option<String>,
    pub chunk_panels: Vec<ChunkPanel>,
    pub report: Option<String>,
    pub failure: Option<String>,
}

impl From<&ProgressState> for ProgressView {
    fn from(state: &ProgressState) -> Self {
        let stage = state.current_stage();
        let status = if state.status_message().is_empty() {
            default_status(stage).to_string()
        } else {
            state.status_message().to_string()
        };
        let stats = state.stats();
        let counters = vec![
            StatCounter {
                label: "Lines",
                value: format_with_commas(stats.total_lines),
            },
            StatCounter {
                label: "Critical",
                value: stats.critical.to_string(),
            },
            StatCounter {
                label: "Errors",
                value: stats.errors.to_string(),
            },
            StatCounter {
                label: "Warnings",
                value: stats.warnings.to_string(),
            },
        ];
        let chunk_label = match (state.current_chunk(), state.total_chunks()) {
            (Some(index), Some(total)) if stage == Stage::Analyze => {
                Some(format!("Chunk {index}/{total}"))
            }
            _ => None,
        };
        let chunk_panels = state
            .partial_chunks()
            .iter()
            .map(|chunk| ChunkPanel {
                title: if chunk.total > 0 {
                    format!("Chunk {} of {}", chunk.index, chunk.total)
                } else {
                    format!("Chunk {}", chunk.index)
                },
                content: chunk.content.clone(),
            })
            .collect();

        Self {
            stage,
            percent: state.percent(),
            status,
            steps: build_steps(state),
            counters,
            chunk_label,
            chunk_panels,
            report: state.final_result().map(ToOwned::to_owned),
            failure: state.failure().map(ToOwned::to_owned),
        }
    }
}

pub fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Idle => "Idle",
        Stage::Preprocess => "Preprocessing",
        Stage::Analyze => "Analyzing",
        Stage::Synthesize => "Synthesizing",
        Stage::Complete => "Complete",
        Stage::Error => "Error",
    }
}

fn default_status(stage: Stage) -> &'static str {
    match stage {
        Stage::Idle => "Waiting for upload",
        Stage::Preprocess => "Preprocessing log file...",
        Stage::Analyze => "Analyzing chunks...",
        Stage::Synthesize => "Synthesizing final report...",
        Stage::Complete => "Analysis complete",
        Stage::Error => "Analysis failed",
    }
}

fn build_steps(state: &ProgressState) -> Vec<StepView> {
    let stage = state.current_stage();
    let (reached, failed) = match stage {
        Stage::Error => (state.failed_during().unwrap_or(Stage::Idle), true),
        other => (other, false),
    };
    let reached_pos = step_position(reached);

    PIPELINE_STEPS
        .iter()
        .enumerate()
        .map(|(pos, step)| {
            let status = match reached_pos {
                Some(current) if pos < current => StepStatus::Done,
                Some(current) if pos == current => {
                    if failed {
                        StepStatus::Failed
                    } else if *step == Stage::Complete {
                        StepStatus::Done
                    } else {
                        StepStatus::Active
                    }
                }
                // Failing before any step started marks the first one.
                None if failed && pos == 0 => StepStatus::Failed,
                _ => StepStatus::Pending,
            };
            StepView {
                stage: *step,
                label: stage_label(*step),
                status,
            }
        })
        .collect()
}

fn step_position(stage: Stage) -> Option<usize> {
    PIPELINE_STEPS.iter().position(|step| *step == stage)
}

/// `1234567` -> `"1,234,567"`.
pub fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
