use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::watch;

use crate::backend::api::models::{DebateMessage, DebateStatus};
use crate::backend::{ApiClient, ApiError, ApiResult, PollHandle, PollStep, spawn_poller};

/// 停止請求逾時時顯示給使用者的訊息。
pub const STOP_TIMED_OUT: &str = "stop timed out";

/// 多代理辯論需要的後端能力。
#[async_trait]
pub trait DebateApi: Send + Sync {
    async fn start_debate(&self, topic: &str, profile_ids: &[String], rounds: u32) -> ApiResult<String>;
    async fn get_debate_status(&self, debate_id: &str) -> ApiResult<DebateStatus>;
    async fn get_debate_messages(&self, debate_id: &str) -> ApiResult<Vec<DebateMessage>>;
    async fn stop_debate(&self, debate_id: &str) -> ApiResult<()>;
}

#[async_trait]
impl DebateApi for ApiClient {
    async fn start_debate(&self, topic: &str, profile_ids: &[String], rounds: u32) -> ApiResult<String> {
        ApiClient::start_debate(self, topic, profile_ids, rounds).await
    }

    async fn get_debate_status(&self, debate_id: &str) -> ApiResult<DebateStatus> {
        ApiClient::get_debate_status(self, debate_id).await
    }

    async fn get_debate_messages(&self, debate_id: &str) -> ApiResult<Vec<DebateMessage>> {
        ApiClient::get_debate_messages(self, debate_id).await
    }

    async fn stop_debate(&self, debate_id: &str) -> ApiResult<()> {
        ApiClient::stop_debate(self, debate_id).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebateSnapshot {
    pub debate_id: Option<String>,
    pub topic: String,
    pub status: DebateStatus,
    /// 依收到的順序排列，不會重複。
    pub messages: Vec<DebateMessage>,
    pub finished: bool,
    /// 顯示在辯論畫面底部的提示，例如停止逾時。
    pub notice: Option<String>,
    pub last_error: Option<String>,
}

/// `DebateController::stop` 的結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// 後端在時限內沒有回應；輪詢繼續，由下一次狀態決定是否結束。
    TimedOut,
    Failed(String),
}

/// 辯論畫面的控制器：輪詢狀態與發言，並提供有時限的停止。
#[derive(Clone)]
pub struct DebateController {
    api: Arc<dyn DebateApi>,
    interval: Duration,
    stop_timeout: Duration,
    state: watch::Sender<DebateSnapshot>,
    poller: Arc<Mutex<Option<PollHandle>>>,
}

impl DebateController {
    pub fn new(api: Arc<dyn DebateApi>, interval: Duration, stop_timeout: Duration) -> Self {
        let (state, _) = watch::channel(DebateSnapshot::default());
        Self {
            api,
            interval,
            stop_timeout,
            state,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    pub fn snapshot(&self) -> DebateSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DebateSnapshot> {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn start(&self, topic: &str, profile_ids: &[String], rounds: u32) -> ApiResult<String> {
        self.stop_polling();
        let debate_id = match self.api.start_debate(topic, profile_ids, rounds).await {
            Ok(id) => id,
            Err(err) => {
                self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
                return Err(err);
            }
        };
        info!("debate {} started: {} round(s), {} profile(s)", debate_id, rounds, profile_ids.len());
        self.state.send_replace(DebateSnapshot {
            debate_id: Some(debate_id.clone()),
            topic: topic.to_string(),
            status: DebateStatus {
                total_rounds: rounds,
                ..DebateStatus::default()
            },
            ..DebateSnapshot::default()
        });

        let api = self.api.clone();
        let state = self.state.clone();
        let id = debate_id.clone();
        let handle = spawn_poller(format!("debate {debate_id}"), self.interval, move || {
            let api = api.clone();
            let state = state.clone();
            let id = id.clone();
            async move { poll_once(api.as_ref(), &state, &id).await }
        });
        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(debate_id)
    }

    /// 要求後端停止辯論，最多等待 `stop_timeout`。
    ///
    /// 逾時時設定 `stop timed out` 提示並回傳 `TimedOut`，UI 不會卡住。
    pub async fn stop(&self) -> StopOutcome {
        let Some(debate_id) = self.snapshot().debate_id else {
            return StopOutcome::Stopped;
        };
        let outcome = match tokio::time::timeout(self.stop_timeout, self.api.stop_debate(&debate_id)).await {
            Ok(Ok(())) => StopOutcome::Stopped,
            Ok(Err(err)) => StopOutcome::Failed(err.to_string()),
            Err(_) => StopOutcome::TimedOut,
        };
        match &outcome {
            StopOutcome::Stopped => {
                info!("debate {} stop requested", debate_id);
                self.state.send_modify(|snapshot| snapshot.notice = None);
            }
            StopOutcome::TimedOut => {
                warn!("debate {} stop did not answer within {:?}", debate_id, self.stop_timeout);
                self.state
                    .send_modify(|snapshot| snapshot.notice = Some(STOP_TIMED_OUT.to_string()));
            }
            StopOutcome::Failed(message) => {
                warn!("debate {} stop failed: {}", debate_id, message);
                self.state.send_modify(|snapshot| snapshot.notice = Some(message.clone()));
            }
        }
        outcome
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.stop();
        }
    }
}

async fn poll_once(
    api: &dyn DebateApi,
    state: &watch::Sender<DebateSnapshot>,
    debate_id: &str,
) -> ApiResult<PollStep> {
    let fetched = async {
        let status = api.get_debate_status(debate_id).await?;
        let messages = api.get_debate_messages(debate_id).await?;
        Ok::<_, ApiError>((status, messages))
    }
    .await;
    let (status, messages) = match fetched {
        Ok(pair) => pair,
        Err(err) => {
            let message = err.to_string();
            state.send_modify(|snapshot| snapshot.last_error = Some(message));
            return Err(err);
        }
    };

    let finished = status.status.is_terminal();
    state.send_if_modified(|snapshot| {
        let mut changed = append_unseen(&mut snapshot.messages, messages);
        if snapshot.status != status {
            snapshot.status = status;
            changed = true;
        }
        if snapshot.last_error.take().is_some() {
            changed = true;
        }
        if finished && !snapshot.finished {
            snapshot.finished = true;
            if snapshot.notice.as_deref() == Some(STOP_TIMED_OUT) {
                snapshot.notice = None;
            }
            changed = true;
        }
        changed
    });
    Ok(if finished { PollStep::Stop } else { PollStep::Continue })
}

/// 只附加還沒看過的發言；回傳是否新增了任何一則。
pub(crate) fn append_unseen(local: &mut Vec<DebateMessage>, incoming: Vec<DebateMessage>) -> bool {
    let mut seen: HashSet<String> = local.iter().map(|message| message.id.clone()).collect();
    let before = local.len();
    for message in incoming {
        if seen.insert(message.id.clone()) {
            local.push(message);
        }
    }
    local.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> DebateMessage {
        DebateMessage {
            id: id.to_string(),
            content: format!("message {id}"),
            ..DebateMessage::default()
        }
    }

    #[test]
    fn append_skips_known_ids() {
        let mut local = vec![message("1")];
        assert!(append_unseen(&mut local, vec![message("1"), message("2"), message("2")]));
        assert_eq!(local.len(), 2);
        assert!(!append_unseen(&mut local, vec![message("2")]));
    }
}
