//! 程式助理的逐字輸出。
//!
//! `StreamingChat` 把事件串流累積成文字狀態，UI 每個 tick 讀取最新狀態即可。
//! 狀態轉換：
//!
//! ```text
//! Idle → Streaming ─┬─ done 事件 ─────────────→ Done
//!                   ├─ error 事件 ────────────→ Error
//!                   └─ 逾時 / 傳輸錯誤 → Fallback ─┬→ Done
//!                                                 └→ Error
//! ```
//!
//! 降級時只會做一次非串流呼叫，其結果取代已累積的文字。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::api::{ApiClient, TokenStream, response_text};
use crate::backend::error::{ApiError, ApiResult};

/// 串流中的單一事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// 新的文字片段。
    Chunk(String),
    /// 串流結束；若帶有完整內容則以它為準。
    Done(Option<String>),
    /// 後端明確回報的錯誤。
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    Streaming,
    /// 串流放棄，正在等待一次性呼叫的結果。
    Fallback,
    Done,
    Error(String),
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Error(_))
    }
}

/// UI 看到的串流狀態。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamState {
    pub phase: StreamPhase,
    /// 目前累積（或降級後取得）的文字。
    pub text: String,
    /// 是否改用了一次性呼叫。
    pub fell_back: bool,
}

/// 串流與其降級呼叫所需的後端能力。
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_stream(&self, request: &Value) -> ApiResult<TokenStream>;
    async fn complete(&self, request: &Value) -> ApiResult<String>;
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn open_stream(&self, request: &Value) -> ApiResult<TokenStream> {
        self.assistant_chat_stream(request).await
    }

    async fn complete(&self, request: &Value) -> ApiResult<String> {
        let value = self.assistant_chat(request).await?;
        Ok(response_text(&value))
    }
}

/// 一次進行中的助理回覆。
///
/// 丟棄或呼叫 `cancel` 只會停止本地更新；後端是否真的停止不在保證範圍內。
pub struct StreamingChat {
    state: watch::Receiver<StreamState>,
    task: JoinHandle<()>,
}

impl StreamingChat {
    /// 在背景開始串流。必須在 tokio 執行環境內呼叫。
    pub fn start(backend: Arc<dyn ChatBackend>, request: Value, timeout: Duration) -> Self {
        let (tx, rx) = watch::channel(StreamState::default());
        let task = tokio::spawn(drive(backend, request, timeout, tx));
        Self { state: rx, task }
    }

    /// 目前狀態的快照。
    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    /// 等到進入終止狀態（或背景任務結束）後回傳最後的狀態。
    pub async fn finished(&mut self) -> StreamState {
        loop {
            if self.state.borrow().phase.is_terminal() {
                return self.state();
            }
            if self.state.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl Drop for StreamingChat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Consumed {
    /// 收到 done 或 error 事件。
    Finished,
    /// 傳輸層失敗，需要降級。
    Interrupted(ApiError),
}

async fn drive(
    backend: Arc<dyn ChatBackend>,
    request: Value,
    timeout: Duration,
    tx: watch::Sender<StreamState>,
) {
    tx.send_modify(|state| state.phase = StreamPhase::Streaming);

    let reason = match tokio::time::timeout(timeout, consume(backend.as_ref(), &request, &tx)).await
    {
        Ok(Consumed::Finished) => return,
        Ok(Consumed::Interrupted(err)) => format!("stream interrupted: {err}"),
        Err(_) => format!("no completion within {}s", timeout.as_secs()),
    };
    warn!("assistant stream falling back to a single call ({reason})");

    tx.send_modify(|state| {
        state.phase = StreamPhase::Fallback;
        state.fell_back = true;
    });
    match backend.complete(&request).await {
        Ok(text) => tx.send_modify(|state| {
            state.text = text;
            state.phase = StreamPhase::Done;
        }),
        Err(err) => tx.send_modify(|state| state.phase = StreamPhase::Error(err.to_string())),
    }
}

async fn consume(
    backend: &dyn ChatBackend,
    request: &Value,
    tx: &watch::Sender<StreamState>,
) -> Consumed {
    let mut stream = match backend.open_stream(request).await {
        Ok(stream) => stream,
        Err(err) => return Consumed::Interrupted(err),
    };
    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamEvent::Chunk(chunk)) => tx.send_modify(|state| state.text.push_str(&chunk)),
            Ok(StreamEvent::Done(content)) => {
                debug!("assistant stream completed");
                tx.send_modify(|state| {
                    if let Some(content) = content {
                        state.text = content;
                    }
                    state.phase = StreamPhase::Done;
                });
                return Consumed::Finished;
            }
            Ok(StreamEvent::Failed(message)) => {
                tx.send_modify(|state| state.phase = StreamPhase::Error(message));
                return Consumed::Finished;
            }
            Err(err) => return Consumed::Interrupted(err),
        }
    }
    Consumed::Interrupted(ApiError::Malformed(String::from(
        "stream ended without a done event",
    )))
}
