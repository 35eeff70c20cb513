use logai_core::{ChunkPanel, HistoryView, ProgressView, StepStatus};
use logai_engine::HealthStatus;

/// Turns successive progress views into terminal lines, emitting only what
/// changed since the previous view.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    last_line: Option<String>,
    panels_shown: usize,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, view: &ProgressView) -> Vec<String> {
        let mut lines = Vec::new();

        // A fresh session starts from an empty panel list.
        if view.chunk_panels.len() < self.panels_shown {
            self.panels_shown = 0;
        }

        let line = progress_line(view);
        if self.last_line.as_ref() != Some(&line) {
            lines.push(line.clone());
            self.last_line = Some(line);
        }
        for panel in &view.chunk_panels[self.panels_shown..] {
            lines.push(chunk_panel(panel));
        }
        self.panels_shown = view.chunk_panels.len();
        lines
    }
}

pub fn progress_line(view: &ProgressView) -> String {
    let mut line = format!("[{:>3}%] {}", view.percent, steps(view));
    if let Some(label) = &view.chunk_label {
        line.push_str(" | ");
        line.push_str(label);
    }
    line.push_str(" | ");
    line.push_str(&view.status);
    line
}

fn steps(view: &ProgressView) -> String {
    view.steps
        .iter()
        .map(|step| {
            let mark = match step.status {
                StepStatus::Pending => ' ',
                StepStatus::Active => '>',
                StepStatus::Done => 'x',
                StepStatus::Failed => '!',
            };
            format!("[{mark}] {}", step.label)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn stats_line(view: &ProgressView) -> String {
    view.counters
        .iter()
        .map(|counter| format!("{} {}", counter.label, counter.value))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn chunk_panel(panel: &ChunkPanel) -> String {
    format!("--- {} ---\n{}", panel.title, panel.content.trim_end())
}

/// Closing block for a finished session: stats plus the report, or the
/// failure message.
pub fn summary(view: &ProgressView) -> String {
    let mut out = stats_line(view);
    if let Some(failure) = &view.failure {
        out.push_str("\n\nAnalysis failed: ");
        out.push_str(failure);
    } else if let Some(report) = &view.report {
        out.push_str("\n\n");
        out.push_str(report.trim_end());
    }
    out
}

pub fn history(view: &HistoryView, full: bool) -> String {
    match view {
        HistoryView::Empty => "No analyses yet.".to_string(),
        HistoryView::Failed { message } => message.clone(),
        HistoryView::Loaded { count_label, rows } => {
            let mut out = count_label.clone();
            for row in rows {
                out.push_str(&format!(
                    "\n\n#{} {} ({})\n  Lines {} | Critical {} | Errors {} | Warnings {}",
                    row.id,
                    row.file_name,
                    row.date,
                    row.total_lines,
                    row.critical,
                    row.errors,
                    row.warnings
                ));
                if full {
                    out.push_str("\n\n");
                    out.push_str(row.summary.trim_end());
                }
            }
            out
        }
    }
}

pub fn health(status: &HealthStatus) -> String {
    let key = if status.google_api_key_configured {
        "configured"
    } else {
        "missing"
    };
    format!("Service: {} | API key: {}", status.status, key)
}
