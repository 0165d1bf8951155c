mod common;

use std::sync::Arc;

use agentdeck::backend::api::ExportFormat;
use agentdeck::backend::api::models::RunStatus;
use agentdeck::backend::{ApiClient, ApiError, NativeBridge, StreamEvent, TransportResolver};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{Value, json};

use common::{FakeBridge, health_ok, port_of, settings_for_ports, spawn_server};

async fn http_backend(router: Router) -> ApiClient {
    let router = router.route("/api/health", get(|| async { Json(health_ok()) }));
    let base = spawn_server(router).await;
    common::http_client(settings_for_ports(vec![port_of(&base)]))
}

fn native_backend(bridge: Arc<FakeBridge>) -> ApiClient {
    let bridge: Arc<dyn NativeBridge> = bridge;
    ApiClient::new(Arc::new(TransportResolver::new(
        settings_for_ports(Vec::new()),
        Some(bridge),
        reqwest::Client::new(),
    )))
}

#[tokio::test]
async fn error_bodies_surface_the_server_message() {
    let client = http_backend(
        Router::new()
            .route(
                "/api/profiles/{id}",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"detail": "profile not found"})),
                    )
                }),
            )
            .route(
                "/api/providers",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database locked") }),
            )
            .route("/api/sessions", get(|| async { StatusCode::BAD_GATEWAY })),
    )
    .await;

    match client.get_profile("p1").await {
        Err(ApiError::Http { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "profile not found");
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    }
    match client.list_providers().await {
        Err(err @ ApiError::Http { status: 500, .. }) => assert_eq!(err.to_string(), "database locked"),
        other => panic!("expected an HTTP error, got {other:?}"),
    }
    match client.list_sessions().await {
        Err(err @ ApiError::Http { status: 502, .. }) => assert_eq!(err.to_string(), "Bad Gateway"),
        other => panic!("expected an HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_routes_carry_ids_and_bodies() {
    let client = http_backend(
        Router::new()
            .route(
                "/api/runs/parallel",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["prompt"], "ideas?");
                    assert_eq!(body["profile_ids"], json!(["a", "b"]));
                    Json(json!({"run_id": 42}))
                }),
            )
            .route(
                "/api/runs/{id}/results",
                get(|Path(id): Path<String>| async move {
                    assert_eq!(id, "42");
                    Json(json!({"results": [
                        {"profile_id": "a", "status": "completed", "output": "one"},
                        {"profileId": "b", "status": "running"}
                    ]}))
                }),
            )
            .route(
                "/api/sessions/{id}/export",
                post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({"session": id, "format": body["format"]}))
                }),
            ),
    )
    .await;

    let run_id = client
        .start_parallel_run("ideas?", &[String::from("a"), String::from("b")])
        .await
        .unwrap();
    assert_eq!(run_id, "42");

    let results = client.get_run_results(&run_id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, RunStatus::Complete);
    assert_eq!(results[1].profile_id, "b");
    assert_eq!(results[1].status, RunStatus::Running);

    let exported = client.export_session("s 1", ExportFormat::Markdown).await.unwrap();
    assert_eq!(exported["session"], "s 1");
    assert_eq!(exported["format"], "markdown");
}

#[tokio::test]
async fn native_calls_use_camel_case_ids() {
    let bridge = FakeBridge::new(json!({"ok": true}));
    let client = native_backend(bridge.clone());

    client
        .update_profile("p-7", json!({"name": "critic"}))
        .await
        .unwrap();
    client.stop_debate("d-1").await.unwrap();

    let calls = bridge.calls();
    assert_eq!(calls[0].0, "update_profile");
    assert_eq!(
        calls[0].1,
        json!({"profileId": "p-7", "payload": {"name": "critic"}})
    );
    assert_eq!(calls[1], (String::from("stop_debate"), json!({"debateId": "d-1"})));
}

#[tokio::test]
async fn http_assistant_stream_reads_sse_frames() {
    let client = http_backend(Router::new().route(
        "/api/assistant/chat/stream",
        post(|| async {
            (
                [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                "data: {\"chunk\":\"Hel\"}\n\n: keep-alive\n\ndata: {\"chunk\":\"lo\"}\n\ndata: [DONE]\n\n",
            )
        }),
    ))
    .await;

    let events: Vec<StreamEvent> = client
        .assistant_chat_stream(&json!({"messages": []}))
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Chunk(String::from("Hel")),
            StreamEvent::Chunk(String::from("lo")),
            StreamEvent::Done(None),
        ]
    );
}

#[tokio::test]
async fn run_status_reads_plain_and_wrapped_records() {
    let client = http_backend(
        Router::new()
            .route(
                "/api/runs/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "wrapped" {
                        Json(json!({"run": {"id": id, "status": "canceled"}}))
                    } else {
                        Json(json!({"id": id, "status": null}))
                    }
                }),
            ),
    )
    .await;

    assert_eq!(client.get_run_status("wrapped").await.unwrap(), RunStatus::Cancelled);
    assert_eq!(client.get_run_status("plain").await.unwrap(), RunStatus::Pending);
}
