//! Test utilities for HTTP integration tests.
//!
//! `FakeTarget` plays the commanded application: it acknowledges each
//! command and then posts the reply to the advertised answer port.

use async_trait::async_trait;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use restcmd::{Correlator, Prompt};
use restcmd_http::ReplyListener;
use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct ReceivedCommand {
    pub body: serde_json::Value,
    pub answer_port: Option<String>,
    pub answer_host: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeTargetState {
    pub received: Mutex<Vec<ReceivedCommand>>,
    pub rejected_ids: HashSet<String>,
    pub failing_ids: HashSet<String>,
}

pub struct FakeTarget {
    pub addr: SocketAddr,
    pub state: Arc<FakeTargetState>,
    _server: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeTarget {
    pub async fn start() -> Self {
        Self::start_with(&[], &[]).await
    }

    /// `rejected` ids get a 500 and no reply; `failing` ids are answered with `success: false`.
    pub async fn start_with(rejected: &[&str], failing: &[&str]) -> Self {
        let state = Arc::new(FakeTargetState {
            received: Mutex::new(Vec::new()),
            rejected_ids: rejected.iter().map(|id| id.to_string()).collect(),
            failing_ids: failing.iter().map(|id| id.to_string()).collect(),
        });
        let app = Router::new()
            .route("/command", post(handle_command))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake target");
        let addr = listener.local_addr().expect("Failed to get local address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake target failed");
        });
        Self {
            addr,
            state,
            _server: server,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn received(&self) -> Vec<ReceivedCommand> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn received_ids(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|c| c.body["id"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle_command(
    State(state): State<Arc<FakeTargetState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let body: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let command = ReceivedCommand {
        body: body.clone(),
        answer_port: header(&headers, "x-answer-port"),
        answer_host: header(&headers, "x-answer-host"),
        content_type: header(&headers, "content-type"),
    };
    state.received.lock().unwrap().push(command.clone());

    let cmdid = body["id"].as_str().unwrap_or_default().to_string();
    if state.rejected_ids.contains(&cmdid) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "module crashed".to_string());
    }

    if let Some(port) = command.answer_port {
        let success = !state.failing_ids.contains(&cmdid);
        let result = if success { "OK" } else { "command failed" };
        tokio::spawn(async move {
            let reply = serde_json::json!({
                "appname": "fake-app",
                "data": {"cmdid": cmdid},
                "success": success,
                "result": result,
            });
            let url = format!("http://127.0.0.1:{port}/response");
            let _ = reqwest::Client::new().post(url).json(&reply).send().await;
        });
    }

    (StatusCode::OK, "Command received\n".to_string())
}

pub async fn start_listener() -> (ReplyListener, Correlator) {
    let correlator = Correlator::new();
    let listener = ReplyListener::start("127.0.0.1", 0, correlator.clone())
        .await
        .expect("Failed to start reply listener");
    (listener, correlator)
}

pub fn listener_url(listener: &ReplyListener, path: &str) -> String {
    format!("http://{}{}", listener.local_addr(), path)
}

pub fn write_commands(ids: &[&str]) -> NamedTempFile {
    let document: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "data": {"name": id}}))
        .collect();
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create command file");
    file.write_all(serde_json::to_string(&document).unwrap().as_bytes())
        .unwrap();
    file
}

/// Operator double fed from fixed input lines.
#[derive(Default)]
pub struct ScriptedPrompt {
    lines: VecDeque<String>,
}

#[allow(dead_code)]
impl ScriptedPrompt {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn select(&mut self, _available: &[&str]) -> Option<String> {
        self.lines.pop_front()
    }

    async fn confirm(&mut self, _next: &str) -> bool {
        self.lines.pop_front().is_some()
    }
}

/// Interrupt that never fires.
pub async fn never() {
    std::future::pending::<()>().await
}
