use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::info;
use serde_json::{Value, json};

use crate::backend::{ChatBackend, StreamPhase, StreamState, StreamingChat};

/// 助理對話中的單一條目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// 使用者輸入的提示。
    User { prompt: String },
    /// 助理的回覆；`fell_back` 表示改用了一次性呼叫。
    Assistant { text: String, fell_back: bool },
    /// 回覆失敗。
    Error { detail: String },
}

impl TranscriptEntry {
    pub fn text(&self) -> &str {
        match self {
            TranscriptEntry::User { prompt } => prompt,
            TranscriptEntry::Assistant { text, .. } => text,
            TranscriptEntry::Error { detail } => detail,
        }
    }
}

/// 對話歷史與選取游標。
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    selected: usize,
}

impl Transcript {
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// 新增條目並把選取移到最後一筆。
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
        self.selected = self.entries.len().saturating_sub(1);
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    /// 轉成後端接受的對話歷史格式。
    fn history(&self) -> Vec<Value> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::User { prompt } => Some(json!({"role": "user", "content": prompt})),
                TranscriptEntry::Assistant { text, .. } => {
                    Some(json!({"role": "assistant", "content": text}))
                }
                TranscriptEntry::Error { .. } => None,
            })
            .collect()
    }
}

struct Inner {
    transcript: Transcript,
    live: Option<StreamingChat>,
}

/// 程式助理畫面的控制器。
///
/// 每個提示啟動一次 `StreamingChat`；UI 每個 tick 呼叫 `tick` 把完成的回覆收進對話。
#[derive(Clone)]
pub struct AssistantController {
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl AssistantController {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            inner: Arc::new(Mutex::new(Inner {
                transcript: Transcript::default(),
                live: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 送出提示。上一個回覆還沒結束時回傳 `false`。
    pub fn submit(&self, prompt: &str, user_id: Option<&str>) -> bool {
        let mut inner = self.lock();
        if inner.live.is_some() {
            return false;
        }
        let mut messages = inner.transcript.history();
        messages.push(json!({"role": "user", "content": prompt}));
        let mut request = json!({ "messages": messages });
        if let Some(user_id) = user_id {
            request["userId"] = Value::String(user_id.to_string());
        }
        inner.transcript.push(TranscriptEntry::User {
            prompt: prompt.to_string(),
        });
        info!("assistant prompt submitted ({} chars)", prompt.chars().count());
        inner.live = Some(StreamingChat::start(self.backend.clone(), request, self.timeout));
        true
    }

    /// 進行中回覆的即時狀態。
    pub fn live(&self) -> Option<StreamState> {
        self.lock().live.as_ref().map(StreamingChat::state)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().live.is_some()
    }

    /// 若回覆已結束，把結果寫進對話並回傳 `true`。
    pub fn tick(&self) -> bool {
        let mut inner = self.lock();
        let Some(state) = inner.live.as_ref().map(StreamingChat::state) else {
            return false;
        };
        let entry = match state.phase {
            StreamPhase::Done => TranscriptEntry::Assistant {
                text: state.text,
                fell_back: state.fell_back,
            },
            StreamPhase::Error(detail) => TranscriptEntry::Error { detail },
            _ => return false,
        };
        inner.live = None;
        inner.transcript.push(entry);
        true
    }

    /// 放棄進行中的回覆，已收到的文字保留在對話裡。
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if let Some(live) = inner.live.take() {
            live.cancel();
            let partial = live.state().text;
            if !partial.is_empty() {
                inner.transcript.push(TranscriptEntry::Assistant {
                    text: partial,
                    fell_back: false,
                });
            }
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.lock().transcript.clone()
    }

    pub fn move_selection(&self, delta: isize) {
        self.lock().transcript.move_selection(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::api::TokenStream;
    use crate::backend::{ApiResult, StreamEvent};
    use async_trait::async_trait;
    use futures_util::stream;

    struct Scripted;

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn open_stream(&self, _request: &Value) -> ApiResult<TokenStream> {
            Ok(Box::pin(stream::iter(vec![
                Ok(StreamEvent::Chunk(String::from("Hel"))),
                Ok(StreamEvent::Chunk(String::from("lo"))),
                Ok(StreamEvent::Done(None)),
            ])))
        }

        async fn complete(&self, _request: &Value) -> ApiResult<String> {
            Ok(String::from("unused"))
        }
    }

    #[tokio::test]
    async fn completed_reply_lands_in_transcript() {
        let controller = AssistantController::new(Arc::new(Scripted), Duration::from_secs(120));
        assert!(controller.submit("hi", None));
        assert!(!controller.submit("again", None));

        for _ in 0..100 {
            if controller.tick() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let transcript = controller.transcript();
        assert_eq!(
            transcript.entries(),
            &[
                TranscriptEntry::User {
                    prompt: String::from("hi")
                },
                TranscriptEntry::Assistant {
                    text: String::from("Hello"),
                    fell_back: false
                },
            ]
        );
        assert!(!controller.is_busy());
    }

    #[test]
    fn selection_is_clamped() {
        let mut transcript = Transcript::default();
        transcript.move_selection(3);
        assert_eq!(transcript.selected_index(), 0);
        transcript.push(TranscriptEntry::User { prompt: String::from("a") });
        transcript.push(TranscriptEntry::Error { detail: String::from("b") });
        transcript.move_selection(-5);
        assert_eq!(transcript.selected_index(), 0);
        transcript.move_selection(9);
        assert_eq!(transcript.selected_index(), 1);
    }
}
