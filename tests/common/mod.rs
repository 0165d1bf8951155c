#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use agentdeck::backend::config::BackendSettings;
use agentdeck::backend::{ApiClient, ApiResult, NativeBridge, NativeEvent, TransportResolver};
use async_trait::async_trait;
use axum::Router;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A port nothing listens on.
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn port_of(base_url: &str) -> u16 {
    base_url.rsplit(':').next().unwrap().parse().unwrap()
}

pub fn settings_for_ports(ports: Vec<u16>) -> BackendSettings {
    BackendSettings {
        candidate_ports: ports,
        probe_timeout_ms: 500,
        ..BackendSettings::default()
    }
}

pub fn http_client(settings: BackendSettings) -> ApiClient {
    ApiClient::new(Arc::new(TransportResolver::new(settings, None, reqwest::Client::new())))
}

/// In-memory native backend that records every invocation.
pub struct FakeBridge {
    pub calls: Mutex<Vec<(String, Value)>>,
    pub events: broadcast::Sender<NativeEvent>,
    pub reply: Value,
}

impl FakeBridge {
    pub fn new(reply: Value) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            events,
            reply,
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NativeBridge for FakeBridge {
    fn name(&self) -> &str {
        "fake"
    }

    async fn invoke(&self, command: &str, args: Value) -> ApiResult<Value> {
        self.calls.lock().unwrap().push((command.to_string(), args));
        Ok(self.reply.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<NativeEvent> {
        self.events.subscribe()
    }
}

pub fn health_ok() -> Value {
    json!({"status": "ok"})
}
