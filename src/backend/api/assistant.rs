use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use log::warn;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{ApiClient, Call, extract_id};
use crate::backend::error::{ApiError, ApiResult};
use crate::backend::resolver::Resolution;
use crate::backend::stream::StreamEvent;
use crate::backend::transport::NativeEvent;
use crate::backend::transport::native::TERMINATED_EVENT;

/// 逐字輸出的串流。`Err` 代表傳輸層中斷，`StreamEvent::Failed` 代表後端明確回報錯誤。
pub type TokenStream = Pin<Box<dyn Stream<Item = ApiResult<StreamEvent>> + Send>>;

const TOKEN_EVENT: &str = "assistant-token";
const DONE_EVENT: &str = "assistant-done";
const ERROR_EVENT: &str = "assistant-error";

impl ApiClient {
    /// 程式助理的一次性（非串流）呼叫。
    pub async fn assistant_chat(&self, request: &Value) -> ApiResult<Value> {
        self.send(Call::post("assistant_chat", "/api/assistant/chat").payload(request.clone()))
            .await
    }

    /// 開啟程式助理的逐字串流。
    ///
    /// 原生模式先訂閱事件再送出指令，避免漏掉最早的 token；
    /// HTTP 模式則讀取 SSE。
    pub async fn assistant_chat_stream(&self, request: &Value) -> ApiResult<TokenStream> {
        match self.resolver().resolve().await {
            Resolution::Native(bridge) => {
                let events = bridge.subscribe();
                let started = bridge
                    .invoke("assistant_chat_stream", json!({ "payload": request }))
                    .await?;
                let stream_id = extract_id(&started, &["streamId", "stream_id", "id"])?;
                Ok(native_token_stream(events, stream_id))
            }
            Resolution::Http(transport) => {
                let mut frames = transport
                    .open_sse("/api/assistant/chat/stream", request)
                    .await?;
                Ok(Box::pin(async_stream::stream! {
                    while let Some(frame) = frames.next().await {
                        match frame {
                            Ok(data) => {
                                if let Some(event) = sse_stream_event(&data) {
                                    let finished = !matches!(event, StreamEvent::Chunk(_));
                                    yield Ok(event);
                                    if finished {
                                        break;
                                    }
                                }
                            }
                            Err(err) => {
                                yield Err(err);
                                break;
                            }
                        }
                    }
                }))
            }
            Resolution::Unreachable => Err(ApiError::Unreachable),
        }
    }
}

/// 從原生事件頻道取出屬於 `stream_id` 的項目。
///
/// 頻道落後（事件被丟棄）時以錯誤結束，讓呼叫端改用一次性呼叫，
/// 而不是回傳缺字的結果。
fn native_token_stream(mut events: broadcast::Receiver<NativeEvent>, stream_id: String) -> TokenStream {
    Box::pin(async_stream::stream! {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(item) = native_stream_item(&event, &stream_id) {
                        let finished = !matches!(item, Ok(StreamEvent::Chunk(_)));
                        yield item;
                        if finished {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("assistant stream {} lagged, {} event(s) dropped", stream_id, skipped);
                    yield Err(ApiError::Native(format!(
                        "native event channel lagged, {skipped} event(s) dropped"
                    )));
                    break;
                }
                Err(RecvError::Closed) => {
                    yield Err(ApiError::Native(String::from("native event channel closed")));
                    break;
                }
            }
        }
    })
}

/// 把原生事件轉成串流項目；不屬於這個串流的事件回傳 `None`。
fn native_stream_item(event: &NativeEvent, stream_id: &str) -> Option<ApiResult<StreamEvent>> {
    if event.event == TERMINATED_EVENT {
        return Some(Err(ApiError::Native(String::from("native backend exited"))));
    }
    let owner = event
        .payload
        .get("streamId")
        .or_else(|| event.payload.get("stream_id"))
        .map(|id| match id {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        });
    if owner.as_deref() != Some(stream_id) {
        return None;
    }
    match event.event.as_str() {
        TOKEN_EVENT => text_field(&event.payload, "chunk").map(|chunk| Ok(StreamEvent::Chunk(chunk))),
        DONE_EVENT => Some(Ok(StreamEvent::Done(text_field(&event.payload, "content")))),
        ERROR_EVENT => Some(Ok(StreamEvent::Failed(
            text_field(&event.payload, "error").unwrap_or_else(|| String::from("assistant error")),
        ))),
        _ => None,
    }
}

/// 解析 SSE 的 `data:` 內容。
fn sse_stream_event(data: &str) -> Option<StreamEvent> {
    let trimmed = data.trim();
    if trimmed == "[DONE]" {
        return Some(StreamEvent::Done(None));
    }
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        // 不是 JSON 就當成純文字片段。
        Err(_) => return Some(StreamEvent::Chunk(data.to_string())),
    };
    if let Some(error) = text_field(&value, "error") {
        return Some(StreamEvent::Failed(error));
    }
    if value.get("done").and_then(Value::as_bool) == Some(true) {
        return Some(StreamEvent::Done(text_field(&value, "content")));
    }
    text_field(&value, "chunk").map(StreamEvent::Chunk)
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// 從一次性回應中取出顯示用的文字。
pub fn response_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            for key in ["content", "response", "text", "message"] {
                match map.get(key) {
                    Some(Value::String(text)) => return text.clone(),
                    Some(nested @ Value::Object(_)) => return response_text(nested),
                    _ => {}
                }
            }
            value.to_string()
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
