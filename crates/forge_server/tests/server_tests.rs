//! End-to-end HTTP tests against a live listener.

use std::sync::Arc;
use std::time::Duration;

use forge_core::{ProgressStream, SessionRegistry};
use forge_heal::{GenerationPipeline, HealConfig, HealingLoop, PipelineConfig, SessionLauncher};
use forge_llm::{MockCodeGenerator, MockDelays};
use forge_runner::{MockBuild, MockBuildTool};
use forge_server::{router, AppState};
use forge_store::MemoryStore;
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn_server(tool: MockBuildTool) -> String {
    let healer = HealingLoop::new(
        Arc::new(tool),
        Arc::new(MockCodeGenerator::new().with_delays(MockDelays::none())),
        HealConfig::new(),
    );
    let pipeline = GenerationPipeline::new(healer, Arc::new(MemoryStore::new()), PipelineConfig::new());
    let state = AppState::new(SessionLauncher::new(
        Arc::new(SessionRegistry::new()),
        Arc::new(ProgressStream::new()),
        Arc::new(pipeline),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", address)
}

/// Read SSE `data:` payloads until one has a terminal type.
async fn read_until_terminal(response: &mut reqwest::Response) -> Vec<Value> {
    let mut buffer = String::new();
    let mut events = Vec::new();

    loop {
        let chunk = tokio::time::timeout(Duration::from_secs(10), response.chunk())
            .await
            .expect("feed stalled")
            .unwrap()
            .expect("feed closed before a terminal event");
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                    let event: Value = serde_json::from_str(data).unwrap();
                    let terminal = matches!(event["type"].as_str(), Some("complete" | "error"));
                    events.push(event);
                    if terminal {
                        return events;
                    }
                }
            }
        }
    }
}

fn types(events: &[Value]) -> Vec<&str> {
    events.iter().filter_map(|e| e["type"].as_str()).collect()
}

#[tokio::test]
async fn test_session_streams_to_completion() {
    let base = spawn_server(MockBuildTool::new().with_responses(vec![
        MockBuild::failure("error[E0308]: mismatched types\n  --> src/lib.rs:9:5\n\n"),
        MockBuild::success("Finished release"),
    ]))
    .await;
    let client = reqwest::Client::new();

    let mut feed = client
        .get(format!("{}/api/generation/generate-stream/s1?userId=erd1alice", base))
        .send()
        .await
        .unwrap();
    assert_eq!(feed.status(), 200);
    assert_eq!(feed.headers()["content-type"], "text/event-stream");
    assert_eq!(feed.headers()["cache-control"], "no-cache");

    let started: Value = client
        .post(format!("{}/api/generation/generate-start", base))
        .json(&json!({"sessionId": "s1", "description": "A token", "category": "token"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started, json!({"success": true, "accepted": true, "sessionId": "s1"}));

    let events = read_until_terminal(&mut feed).await;
    let kinds = types(&events);
    assert_eq!(kinds.first(), Some(&"connected"));
    assert_eq!(kinds.iter().filter(|k| **k == "compile_start").count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == "fixing").count(), 1);

    let complete = events.last().unwrap();
    assert_eq!(complete["type"], "complete");
    assert_eq!(complete["data"]["success"], true);
    assert_eq!(complete["data"]["attempts"], 2);

    let cid = complete["data"]["ipfsHash"].as_str().unwrap();
    let artifact: Value = client
        .get(format!("{}/api/code/{}", base, cid))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(artifact["code"], complete["data"]["code"]);
    assert_eq!(artifact["metadata"]["category"], "token");
}

#[tokio::test]
async fn test_request_errors() {
    let base = spawn_server(MockBuildTool::new()).await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/api/generation/generate-start", base))
        .json(&json!({"sessionId": "s1", "description": "A token"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("category"));

    let no_user = client
        .get(format!("{}/api/generation/generate-stream/s1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(no_user.status(), 400);

    let unknown = client
        .get(format!("{}/api/code/bafy-unknown", base))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_health_and_banner() {
    let base = spawn_server(MockBuildTool::new()).await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["timestamp"].is_string());
    assert!(health["uptimeSeconds"].as_i64().is_some_and(|s| s >= 0));

    let banner: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
    assert_eq!(banner["status"], "running");
}
