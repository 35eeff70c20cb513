use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use logai_core::{HistoryRecord, HistoryView, ProgressState, Stage};
use logai_engine::{
    save_report, AccessTokenProvider, EngineEvent, EngineHandle, LogFile, ReportStore,
    SessionError,
};
use logai_logging::{logai_info, logai_warn};

use super::cli::{Cli, Command};
use super::config::{AppConfig, ConfigSource};
use super::logging;
use super::ui::render::{self, ProgressPrinter};

const POLL_INTERVAL: Duration = Duration::from_millis(75);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run_app() -> Result<ExitCode> {
    let cli = Cli::parse();
    let (mut config, source) = AppConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_cli(&cli);

    logging::initialize(config.log);
    match &source {
        ConfigSource::File(path) => logai_info!("loaded config from {:?}", path),
        ConfigSource::Defaults => logai_info!("no config file, using defaults"),
    }
    logai_info!(
        "server={} require_auth={}",
        config.server_url,
        config.require_auth
    );

    let engine = EngineHandle::new(config.client_settings())?;
    let app = App { config, engine };
    match cli.command {
        Command::Analyze { file, save } => app.analyze(file.as_deref(), save),
        Command::History { full, save } => app.history(full, save.as_deref()),
        Command::Health => app.health(),
    }
}

struct App {
    config: AppConfig,
    engine: EngineHandle,
}

impl App {
    /// Token to attach, if any. With auth required, a missing token stops
    /// the command before anything is sent.
    fn auth_token(&self) -> Result<Option<String>> {
        if !self.config.require_auth {
            return Ok(None);
        }
        let token = self
            .config
            .token_provider()
            .access_token()
            .map_err(|err| anyhow!("{err}; set LOGAI_TOKEN or pass --token"))?;
        Ok(Some(token))
    }

    fn analyze(&self, path: Option<&Path>, save: bool) -> Result<ExitCode> {
        let file = path
            .map(|path| LogFile::from_path(path).with_context(|| format!("failed to read {path:?}")))
            .transpose()?;
        let auth_token = self.auth_token()?;
        self.engine.analyze(file, auth_token);

        let mut printer = ProgressPrinter::new();
        let state = loop {
            let Some(event) = self.engine.recv_timeout(POLL_INTERVAL)? else {
                continue;
            };
            match event {
                EngineEvent::SessionStarted { session_id, file_name } => {
                    logai_info!("analyzing {} as session {}", file_name, session_id);
                }
                EngineEvent::SessionRejected(err) => bail!("analysis not started: {err}"),
                EngineEvent::Progress(state) => {
                    for line in printer.update(&state.view()) {
                        println!("{line}");
                    }
                }
                EngineEvent::SessionFinished { state, .. } => break state,
                other => logai_warn!("ignoring unexpected event {:?}", other),
            }
        };

        println!();
        println!("{}", render::summary(&state.view()));
        if save {
            self.save_final_report(path, &state)?;
        }
        Ok(exit_code(&state))
    }

    fn save_final_report(
        &self,
        path: Option<&Path>,
        state: &ProgressState,
    ) -> Result<()> {
        let Some(report) = state.final_result() else {
            logai_warn!("no report to save, analysis ended at {:?}", state.current_stage());
            return Ok(());
        };
        let name = path
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let saved = ReportStore::new(&self.config.report_dir).save(&name, report)?;
        println!("Report saved to {}", saved.display());
        Ok(())
    }

    fn history(&self, full: bool, save: Option<&str>) -> Result<ExitCode> {
        let auth_token = match self.auth_token() {
            Ok(token) => token,
            Err(err) => {
                logai_warn!("history needs a sign-in: {}", err);
                println!("{}", render::history(&HistoryView::auth_required(), false));
                return Ok(ExitCode::FAILURE);
            }
        };
        self.engine.fetch_history(auth_token);

        let result = self.wait_for(|event| match event {
            EngineEvent::HistoryLoaded(result) => Some(result),
            _ => None,
        })?;
        let (view, records) = history_view(result);
        println!("{}", render::history(&view, full));
        if matches!(view, HistoryView::Failed { .. }) {
            return Ok(ExitCode::FAILURE);
        }

        if let Some(id) = save {
            self.save_history_summary(&records, id)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn save_history_summary(&self, records: &[HistoryRecord], id: &str) -> Result<()> {
        let record = records
            .iter()
            .find(|record| record.id.to_string() == id)
            .ok_or_else(|| anyhow!("no analysis with id {id}"))?;
        let saved = save_report(
            &self.config.report_dir,
            record.display_file_name(),
            record.display_summary(),
        )?;
        println!("Report saved to {}", saved.display());
        Ok(())
    }

    fn health(&self) -> Result<ExitCode> {
        self.engine.check_health();
        let status = self.wait_for(|event| match event {
            EngineEvent::HealthChecked(result) => Some(result),
            _ => None,
        })??;
        println!("{}", render::health(&status));
        Ok(if status.is_healthy() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    /// Waits for the first event `pick` accepts.
    fn wait_for<T>(&self, pick: impl Fn(EngineEvent) -> Option<T>) -> Result<T> {
        let deadline = Instant::now() + REQUEST_TIMEOUT;
        while Instant::now() < deadline {
            if let Some(value) = self.engine.recv_timeout(POLL_INTERVAL)?.and_then(&pick) {
                return Ok(value);
            }
        }
        bail!("no response from {} within {:?}", self.config.server_url, REQUEST_TIMEOUT)
    }
}

/// Pairs the loaded records with their view. A rejected request shows only
/// its HTTP status; the server's message goes to the log.
fn history_view(
    result: Result<Vec<HistoryRecord>, SessionError>,
) -> (HistoryView, Vec<HistoryRecord>) {
    match result {
        Ok(records) => (HistoryView::from_records(&records), records),
        Err(SessionError::Expired) => (HistoryView::auth_required(), Vec::new()),
        Err(SessionError::Server { status, message }) => {
            logai_warn!("history request failed with HTTP {}: {}", status, message);
            (HistoryView::failed(format!("HTTP {status}")), Vec::new())
        }
        Err(err) => (HistoryView::failed(&err), Vec::new()),
    }
}

fn exit_code(state: &ProgressState) -> ExitCode {
    if state.current_stage() == Stage::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
