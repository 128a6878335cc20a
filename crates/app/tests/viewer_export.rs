#![allow(missing_docs, reason = "integration tests")]

use console_relay_adapters::{FsExportWriter, Osc52Clipboard, StaticAccess, WorkerClient};
use console_relay_app::{
    ChainSettings, ExportDeps, ExportDestination, ExportFormat, ViewerDeps, clear_logs,
    compute_system_flow, export, group_error_chains, load_trace, parse_structured_export,
};
use console_relay_domain::{SystemTag, TraceId};
use console_relay_shared::ErrorCode;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn Error>>;

const TRACE: &str = "trace_1700000000000_0badf00d";

async fn serve_trace(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/logs"))
        .and(query_param("trace_id", TRACE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [
                {
                    "id": "a",
                    "trace_id": TRACE,
                    "user_id": "user-7",
                    "timestamp": 1_700_000_000_000_u64,
                    "level": "info",
                    "message": "checkout opened",
                    "system": "browser",
                    "context": {"route": "/checkout"}
                },
                {
                    "id": "b",
                    "trace_id": TRACE,
                    "user_id": "user-7",
                    "timestamp": 1_700_000_000_400_u64,
                    "level": "error",
                    "message": "[BACKEND payments] charge declined",
                    "system": "backend",
                    "stack": "at payments.rs:88",
                    "synced_at": 1_700_000_001_000_u64
                },
                {
                    "id": "c",
                    "trace_id": TRACE,
                    "user_id": "user-7",
                    "timestamp": 1_700_000_000_900_u64,
                    "level": "warn",
                    "message": "payment retry shown",
                    "system": "browser",
                    "stack": "at checkout.tsx:12",
                    "attempt": 2
                }
            ]
        })))
        .mount(server)
        .await;
}

fn viewer(server: &MockServer, owner: bool) -> Result<ViewerDeps, Box<dyn Error>> {
    Ok(ViewerDeps {
        store: Arc::new(WorkerClient::new(&server.uri())?),
        access: Arc::new(StaticAccess::new(owner)),
    })
}

#[tokio::test]
async fn structured_export_round_trips() -> TestResult {
    let server = MockServer::start().await;
    serve_trace(&server).await;

    let trace_id = TraceId::parse(TRACE)?;
    let logs = load_trace(&viewer(&server, false)?, &trace_id).await?;
    assert_eq!(logs.entries.len(), 3);

    let dir = std::env::temp_dir().join("console_relay_viewer_export_test");
    let _ = std::fs::remove_dir_all(&dir);
    let deps = ExportDeps {
        clipboard: Arc::new(Osc52Clipboard::with_writer(Box::new(std::io::sink()))),
        files: Arc::new(FsExportWriter::new(&dir)),
    };
    let report = export(
        &deps,
        &logs.entries,
        ExportFormat::Json,
        ExportDestination::File,
        1_700_000_005_000,
    )?;
    assert!(report.delivered);
    assert_eq!(report.count, 3);
    assert_eq!(
        report.file_name,
        format!("debug-logs-{TRACE}-1700000005000.json")
    );

    let location = report.location.ok_or("export reported no location")?;
    let parsed = parse_structured_export(&std::fs::read_to_string(location)?)?;
    assert_eq!(parsed.trace_id, Some(trace_id));
    assert_eq!(parsed.count, 3);
    assert_eq!(parsed.logs, logs.entries);
    assert_eq!(
        parsed.logs.get(2).and_then(|entry| entry.extra.get("attempt")),
        Some(&json!(2))
    );

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[tokio::test]
async fn chains_and_flow_over_a_fetched_trace() -> TestResult {
    let server = MockServer::start().await;
    serve_trace(&server).await;

    let logs = load_trace(&viewer(&server, false)?, &TraceId::parse(TRACE)?).await?;

    let chains = group_error_chains(&logs.entries, ChainSettings::default());
    assert_eq!(chains.len(), 1);
    let chain = chains.first().ok_or("missing chain")?;
    assert_eq!(chain.entries.len(), 2);
    assert_eq!(chain.systems, vec![SystemTag::Backend, SystemTag::Browser]);

    let flow = compute_system_flow(&logs.entries);
    let systems: Vec<SystemTag> = flow.iter().map(|step| step.system).collect();
    assert_eq!(
        systems,
        vec![SystemTag::Browser, SystemTag::Backend, SystemTag::Browser]
    );
    let durations: Vec<u64> = flow.iter().map(|step| step.duration_ms).collect();
    assert_eq!(durations, vec![400, 500, 0]);
    Ok(())
}

#[tokio::test]
async fn clear_requires_owner_and_hits_worker_once() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/logs/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let denied = clear_logs(&viewer(&server, false)?).await.err();
    assert_eq!(
        denied.map(|error| error.code),
        Some(ErrorCode::permission_denied())
    );
    assert_eq!(clear_logs(&viewer(&server, true)?).await?, 3);
    Ok(())
}
