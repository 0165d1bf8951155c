use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use agentdeck::backend::api::TokenStream;
use agentdeck::backend::{ApiError, ApiResult, ChatBackend, StreamEvent, StreamPhase, StreamingChat};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};

enum Script {
    /// One chunk, then nothing ever again.
    Stall,
    /// One chunk, then a transport error.
    Break,
    /// An explicit error event.
    Reject,
}

struct ScriptedBackend {
    script: Script,
    fallbacks: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            fallbacks: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn open_stream(&self, _request: &Value) -> ApiResult<TokenStream> {
        let first = stream::iter(vec![Ok(StreamEvent::Chunk(String::from("partial ")))]);
        let events: TokenStream = match self.script {
            Script::Stall => Box::pin(first.chain(stream::pending())),
            Script::Break => Box::pin(first.chain(stream::iter(vec![Err(ApiError::Native(
                String::from("pipe closed"),
            ))]))),
            Script::Reject => Box::pin(stream::iter(vec![Ok(StreamEvent::Failed(String::from(
                "quota exceeded",
            )))])),
        };
        Ok(events)
    }

    async fn complete(&self, _request: &Value) -> ApiResult<String> {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        Ok(String::from("complete answer"))
    }
}

#[tokio::test(start_paused = true)]
async fn missing_done_event_falls_back_once_after_timeout() {
    let backend = ScriptedBackend::new(Script::Stall);
    let mut chat = StreamingChat::start(backend.clone(), json!({}), Duration::from_secs(120));

    tokio::time::sleep(Duration::from_secs(60)).await;
    let midway = chat.state();
    assert_eq!(midway.phase, StreamPhase::Streaming);
    assert_eq!(midway.text, "partial ");
    assert_eq!(backend.fallbacks.load(Ordering::SeqCst), 0);

    let done = chat.finished().await;
    assert_eq!(done.phase, StreamPhase::Done);
    assert_eq!(done.text, "complete answer");
    assert!(done.fell_back);
    assert_eq!(backend.fallbacks.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(backend.fallbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_error_falls_back_immediately() {
    let backend = ScriptedBackend::new(Script::Break);
    let mut chat = StreamingChat::start(backend.clone(), json!({}), Duration::from_secs(120));

    let done = tokio::time::timeout(Duration::from_secs(1), chat.finished())
        .await
        .expect("fallback should not wait for the stream timeout");
    assert_eq!(done.text, "complete answer");
    assert_eq!(backend.fallbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_error_event_is_terminal_without_fallback() {
    let backend = ScriptedBackend::new(Script::Reject);
    let mut chat = StreamingChat::start(backend.clone(), json!({}), Duration::from_secs(120));

    let done = chat.finished().await;
    assert_eq!(done.phase, StreamPhase::Error(String::from("quota exceeded")));
    assert!(!done.fell_back);
    assert_eq!(backend.fallbacks.load(Ordering::SeqCst), 0);
}
