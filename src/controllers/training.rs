use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use tokio::sync::watch;

use crate::backend::api::models::TrainingJob;
use crate::backend::{ApiClient, ApiResult, PollHandle, PollStep, spawn_poller};

#[async_trait]
pub trait TrainingApi: Send + Sync {
    async fn list_training_jobs(&self) -> ApiResult<Vec<TrainingJob>>;
    async fn start_training(&self, config: Value) -> ApiResult<String>;
    async fn get_training_job(&self, job_id: &str) -> ApiResult<TrainingJob>;
    async fn get_training_logs(&self, job_id: &str) -> ApiResult<Vec<String>>;
    async fn cancel_training(&self, job_id: &str) -> ApiResult<()>;
}

#[async_trait]
impl TrainingApi for ApiClient {
    async fn list_training_jobs(&self) -> ApiResult<Vec<TrainingJob>> {
        ApiClient::list_training_jobs(self).await
    }

    async fn start_training(&self, config: Value) -> ApiResult<String> {
        ApiClient::start_training(self, config).await
    }

    async fn get_training_job(&self, job_id: &str) -> ApiResult<TrainingJob> {
        ApiClient::get_training_job(self, job_id).await
    }

    async fn get_training_logs(&self, job_id: &str) -> ApiResult<Vec<String>> {
        ApiClient::get_training_logs(self, job_id).await
    }

    async fn cancel_training(&self, job_id: &str) -> ApiResult<()> {
        ApiClient::cancel_training(self, job_id).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSnapshot {
    pub jobs: Vec<TrainingJob>,
    /// 正在追蹤的工作。
    pub active: Option<TrainingJob>,
    pub logs: Vec<String>,
    pub last_error: Option<String>,
}

/// 訓練畫面的控制器。追蹤單一工作，每兩秒更新一次進度。
#[derive(Clone)]
pub struct TrainingController {
    api: Arc<dyn TrainingApi>,
    interval: Duration,
    state: watch::Sender<TrainingSnapshot>,
    poller: Arc<Mutex<Option<PollHandle>>>,
}

impl TrainingController {
    pub fn new(api: Arc<dyn TrainingApi>, interval: Duration) -> Self {
        let (state, _) = watch::channel(TrainingSnapshot::default());
        Self {
            api,
            interval,
            state,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    pub fn snapshot(&self) -> TrainingSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrainingSnapshot> {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 重新載入工作清單。若有未結束的工作，且目前追蹤的工作已結束（或沒有），就改追蹤它。
    pub async fn refresh(&self) -> ApiResult<()> {
        let jobs = match self.api.list_training_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
                return Err(err);
            }
        };
        let resume = jobs.iter().find(|job| !job.status.is_terminal()).cloned();
        let tracking = self
            .snapshot()
            .active
            .as_ref()
            .is_some_and(|job| !job.status.is_terminal());
        self.state.send_modify(|snapshot| {
            snapshot.jobs = jobs;
            snapshot.last_error = None;
        });
        if let Some(job) = resume
            && !tracking
        {
            self.track(job);
        }
        Ok(())
    }

    pub async fn start(&self, config: Value) -> ApiResult<String> {
        let job_id = match self.api.start_training(config).await {
            Ok(id) => id,
            Err(err) => {
                self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
                return Err(err);
            }
        };
        info!("training job {} submitted", job_id);
        self.track(TrainingJob {
            id: job_id.clone(),
            ..TrainingJob::default()
        });
        Ok(job_id)
    }

    pub async fn cancel(&self) -> ApiResult<()> {
        let Some(job) = self.snapshot().active else {
            return Ok(());
        };
        if let Err(err) = self.api.cancel_training(&job.id).await {
            warn!("failed to cancel training job {}: {}", job.id, err);
            self.state.send_modify(|snapshot| snapshot.last_error = Some(err.to_string()));
            return Err(err);
        }
        Ok(())
    }

    /// 取得目前工作的完整日誌。
    pub async fn logs(&self) -> ApiResult<()> {
        let Some(job) = self.snapshot().active else {
            return Ok(());
        };
        let logs = self.api.get_training_logs(&job.id).await?;
        self.state.send_modify(|snapshot| snapshot.logs = logs);
        Ok(())
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.stop();
        }
    }

    fn track(&self, job: TrainingJob) {
        self.stop_polling();
        let job_id = job.id.clone();
        self.state.send_modify(|snapshot| {
            snapshot.active = Some(job);
            snapshot.logs.clear();
        });

        let api = self.api.clone();
        let state = self.state.clone();
        let handle = spawn_poller(format!("training {job_id}"), self.interval, move || {
            let api = api.clone();
            let state = state.clone();
            let id = job_id.clone();
            async move { poll_once(api.as_ref(), &state, &id).await }
        });
        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

async fn poll_once(
    api: &dyn TrainingApi,
    state: &watch::Sender<TrainingSnapshot>,
    job_id: &str,
) -> ApiResult<PollStep> {
    let job = match api.get_training_job(job_id).await {
        Ok(job) => job,
        Err(err) => {
            let message = err.to_string();
            state.send_modify(|snapshot| snapshot.last_error = Some(message));
            return Err(err);
        }
    };
    let finished = job.status.is_terminal();
    state.send_if_modified(|snapshot| {
        let mut changed = snapshot.last_error.take().is_some();
        if let Some(listed) = snapshot.jobs.iter_mut().find(|listed| listed.id == job.id)
            && *listed != job
        {
            *listed = job.clone();
            changed = true;
        }
        if snapshot.active.as_ref() != Some(&job) {
            snapshot.active = Some(job);
            changed = true;
        }
        changed
    });
    if finished {
        info!("training job {} finished", job_id);
    }
    Ok(if finished { PollStep::Stop } else { PollStep::Continue })
}
