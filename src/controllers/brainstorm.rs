use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::watch;

use crate::backend::api::models::{AgentResult, RunStatus};
use crate::backend::{ApiClient, ApiError, ApiResult, PollHandle, PollStep, spawn_poller};

/// 平行腦力激盪需要的後端能力。
#[async_trait]
pub trait BrainstormApi: Send + Sync {
    async fn start_parallel_run(&self, prompt: &str, profile_ids: &[String]) -> ApiResult<String>;
    async fn get_run_status(&self, run_id: &str) -> ApiResult<RunStatus>;
    async fn get_run_results(&self, run_id: &str) -> ApiResult<Vec<AgentResult>>;
    async fn cancel_run(&self, run_id: &str) -> ApiResult<()>;
}

#[async_trait]
impl BrainstormApi for ApiClient {
    async fn start_parallel_run(&self, prompt: &str, profile_ids: &[String]) -> ApiResult<String> {
        ApiClient::start_parallel_run(self, prompt, profile_ids).await
    }

    async fn get_run_status(&self, run_id: &str) -> ApiResult<RunStatus> {
        ApiClient::get_run_status(self, run_id).await
    }

    async fn get_run_results(&self, run_id: &str) -> ApiResult<Vec<AgentResult>> {
        ApiClient::get_run_results(self, run_id).await
    }

    async fn cancel_run(&self, run_id: &str) -> ApiResult<()> {
        ApiClient::cancel_run(self, run_id).await.map(|_| ())
    }
}

/// 畫面看到的腦力激盪狀態。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrainstormSnapshot {
    pub run_id: Option<String>,
    pub prompt: String,
    /// 每個代理一筆，順序跟隨後端回傳。
    pub results: Vec<AgentResult>,
    /// 所有代理都已進入終止狀態，或執行本身已結束。
    pub finished: bool,
    pub last_error: Option<String>,
}

impl BrainstormSnapshot {
    pub fn is_running(&self) -> bool {
        self.run_id.is_some() && !self.finished
    }
}

/// 平行腦力激盪畫面的控制器。
///
/// 啟動後每秒取一次各代理結果，與本地狀態比對後更新，
/// 直到每個代理都是 `complete`、`failed` 或 `cancelled`。
#[derive(Clone)]
pub struct BrainstormController {
    api: Arc<dyn BrainstormApi>,
    interval: Duration,
    state: watch::Sender<BrainstormSnapshot>,
    poller: Arc<Mutex<Option<PollHandle>>>,
}

impl BrainstormController {
    pub fn new(api: Arc<dyn BrainstormApi>, interval: Duration) -> Self {
        let (state, _) = watch::channel(BrainstormSnapshot::default());
        Self {
            api,
            interval,
            state,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    pub fn snapshot(&self) -> BrainstormSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BrainstormSnapshot> {
        self.state.subscribe()
    }

    /// 是否仍在輪詢。
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 啟動新的平行執行。先前的輪詢會被停止。
    pub async fn start(&self, prompt: &str, profile_ids: &[String]) -> ApiResult<String> {
        self.stop_polling();
        let run_id = match self.api.start_parallel_run(prompt, profile_ids).await {
            Ok(run_id) => run_id,
            Err(err) => {
                self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
                return Err(err);
            }
        };
        info!("parallel run {} started with {} profile(s)", run_id, profile_ids.len());
        self.state.send_replace(BrainstormSnapshot {
            run_id: Some(run_id.clone()),
            prompt: prompt.to_string(),
            ..BrainstormSnapshot::default()
        });

        let api = self.api.clone();
        let state = self.state.clone();
        let id = run_id.clone();
        let handle = spawn_poller(format!("run {run_id}"), self.interval, move || {
            let api = api.clone();
            let state = state.clone();
            let id = id.clone();
            async move { poll_once(api.as_ref(), &state, &id).await }
        });
        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(run_id)
    }

    /// 要求後端取消。輪詢會繼續，直到觀察到終止狀態。
    pub async fn cancel(&self) -> ApiResult<()> {
        let Some(run_id) = self.snapshot().run_id else {
            return Ok(());
        };
        if let Err(err) = self.api.cancel_run(&run_id).await {
            warn!("failed to cancel run {}: {}", run_id, err);
            self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
            return Err(err);
        }
        Ok(())
    }

    /// 停止本地輪詢（離開畫面時使用）。
    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.stop();
        }
    }
}

async fn poll_once(
    api: &dyn BrainstormApi,
    state: &watch::Sender<BrainstormSnapshot>,
    run_id: &str,
) -> ApiResult<PollStep> {
    let incoming = match api.get_run_results(run_id).await {
        Ok(results) => results,
        Err(err) => {
            record_error(state, &err);
            return Err(err);
        }
    };
    let results_done =
        !incoming.is_empty() && incoming.iter().all(|result| result.status.is_terminal());
    state.send_if_modified(|snapshot| {
        let mut changed = merge_results(&mut snapshot.results, incoming);
        if snapshot.last_error.take().is_some() {
            changed = true;
        }
        changed
    });

    // 取消或提早失敗的執行可能永遠沒有代理結果，改看執行本身的狀態。
    let finished = results_done
        || match api.get_run_status(run_id).await {
            Ok(status) => status.is_terminal(),
            Err(err) => {
                record_error(state, &err);
                return Err(err);
            }
        };
    if finished {
        state.send_if_modified(|snapshot| !std::mem::replace(&mut snapshot.finished, true));
        return Ok(PollStep::Stop);
    }
    Ok(PollStep::Continue)
}

fn record_error(state: &watch::Sender<BrainstormSnapshot>, err: &ApiError) {
    let message = err.to_string();
    state.send_if_modified(|snapshot| {
        if snapshot.last_error.as_deref() == Some(message.as_str()) {
            return false;
        }
        snapshot.last_error = Some(message);
        true
    });
}

/// 以代理 id 比對本地與最新結果；回傳是否有任何變動。
pub(crate) fn merge_results(local: &mut Vec<AgentResult>, incoming: Vec<AgentResult>) -> bool {
    if *local == incoming {
        return false;
    }
    let mut merged = Vec::with_capacity(incoming.len());
    for result in incoming {
        match local.iter().position(|existing| existing.profile_id == result.profile_id) {
            Some(index) if local[index] == result => merged.push(local.swap_remove(index)),
            _ => merged.push(result),
        }
    }
    *local = merged;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::api::models::RunStatus;

    fn result(profile: &str, status: RunStatus) -> AgentResult {
        AgentResult {
            profile_id: profile.to_string(),
            status,
            output: None,
            error: None,
        }
    }

    #[test]
    fn merge_reports_changes_only_when_different() {
        let mut local = vec![result("a", RunStatus::Running)];
        assert!(!merge_results(&mut local, vec![result("a", RunStatus::Running)]));
        assert!(merge_results(
            &mut local,
            vec![result("a", RunStatus::Complete), result("b", RunStatus::Running)]
        ));
        assert_eq!(local.len(), 2);
        assert_eq!(local[0].status, RunStatus::Complete);
        assert_eq!(local[1].profile_id, "b");
    }
}
