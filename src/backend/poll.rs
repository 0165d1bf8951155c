//! 固定間隔的輪詢迴圈，給所有長時間執行的畫面共用。
//!
//! 每一輪呼叫一次 `tick`；回傳 `PollStep::Stop` 後結束。
//! 錯誤只寫進日誌，下一輪照常進行：沒有退避，也沒有重試上限。

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::error::ApiResult;

/// 單輪輪詢後的決定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Stop,
}

/// 背景輪詢任務的控制代碼。丟棄時會停止輪詢。
pub struct PollHandle {
    label: String,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// 立即停止輪詢；進行中的請求結果會被丟棄。
    pub fn stop(&self) {
        if !self.task.is_finished() {
            debug!("{}: polling stopped", self.label);
        }
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 啟動輪詢任務。第一輪會立刻執行，之後每隔 `interval` 一次。
///
/// 必須在 tokio 執行環境內呼叫。
pub fn spawn_poller<F, Fut>(label: impl Into<String>, interval: Duration, mut tick: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<PollStep>> + Send + 'static,
{
    let label = label.into();
    let task_label = label.clone();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match tick().await {
                Ok(PollStep::Stop) => {
                    debug!("{}: terminal state observed, polling finished", task_label);
                    break;
                }
                Ok(PollStep::Continue) => {}
                Err(err) => warn!("{}: poll failed, will retry: {}", task_label, err),
            }
        }
    });
    PollHandle { label, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::error::ApiError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn errors_do_not_stop_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = spawn_poller("test", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                match n {
                    1 | 2 => Err(ApiError::Unreachable),
                    3 => Ok(PollStep::Continue),
                    _ => Ok(PollStep::Stop),
                }
            }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(handle.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_further_ticks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = spawn_poller("test", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(PollStep::Continue)
            }
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        handle.stop();
        let seen = calls.load(Ordering::SeqCst);
        assert_eq!(seen, 3);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }
}
