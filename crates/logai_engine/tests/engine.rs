use std::time::{Duration, Instant};

use logai_core::Stage;
use logai_engine::{ClientSettings, EngineEvent, EngineHandle, LogFile, SessionError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM: &str = concat!(
    "data: {\"stage\":\"preprocessing\"}\n\n",
    "data: {\"stage\":\"complete\",\"result\":\"# Report\"}\n\n",
);

/// Collects events until `done` matches one, or panics after a few seconds.
fn collect_until(engine: &EngineHandle, done: impl Fn(&EngineEvent) -> bool) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = engine
            .recv_timeout(Duration::from_millis(50))
            .expect("engine worker alive")
        {
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
    }
    panic!("engine did not finish; got {events:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn analyze_reports_progress_and_final_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(STREAM, "text/event-stream"))
        .mount(&server)
        .await;

    let engine = EngineHandle::new(ClientSettings::with_base_url(server.uri())).expect("engine");
    engine.analyze(Some(LogFile::new("app.log", "line\n")), None);

    let events = tokio::task::spawn_blocking(move || {
        collect_until(&engine, |event| matches!(event, EngineEvent::SessionFinished { .. }))
    })
    .await
    .unwrap();

    // The reset snapshot is rendered before the session is announced.
    assert!(matches!(&events[0], EngineEvent::Progress(state) if state.percent() == 0));
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::SessionStarted { file_name, .. } if file_name == "app.log")));
    let Some(EngineEvent::SessionFinished { state, .. }) = events.last() else {
        panic!("last event must be SessionFinished");
    };
    assert_eq!(state.current_stage(), Stage::Complete);
    assert_eq!(state.final_result(), Some("# Report"));
}

#[tokio::test(flavor = "multi_thread")]
async fn analyze_without_file_is_rejected() {
    let engine = EngineHandle::new(ClientSettings::default()).expect("engine");
    engine.analyze(None, None);

    let events = tokio::task::spawn_blocking(move || {
        collect_until(&engine, |event| matches!(event, EngineEvent::SessionRejected(_)))
    })
    .await
    .unwrap();
    assert_eq!(
        events.last(),
        Some(&EngineEvent::SessionRejected(SessionError::NoFile))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn history_and_health_are_delivered_as_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "healthy",
            "google_api_key_configured": false
        })))
        .mount(&server)
        .await;

    let engine = EngineHandle::new(ClientSettings::with_base_url(server.uri())).expect("engine");
    engine.fetch_history(Some("tok".into()));
    engine.check_health();

    let events = tokio::task::spawn_blocking(move || {
        let mut seen = Vec::new();
        seen.extend(collect_until(&engine, |event| {
            matches!(event, EngineEvent::HistoryLoaded(_) | EngineEvent::HealthChecked(_))
        }));
        seen.extend(collect_until(&engine, |event| {
            matches!(event, EngineEvent::HistoryLoaded(_) | EngineEvent::HealthChecked(_))
        }));
        seen
    })
    .await
    .unwrap();

    assert!(events.contains(&EngineEvent::HistoryLoaded(Ok(Vec::new()))));
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::HealthChecked(Ok(health)) if health.is_healthy()
    )));
}
