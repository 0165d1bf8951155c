use serde_json::Value;

use super::models::TrainingJob;
use super::{ApiClient, Call, extract_id, list_field, segment};
use crate::backend::error::ApiResult;

/// 模型訓練工作。訓練本身在後端的 Python 環境執行。
impl ApiClient {
    pub async fn list_training_jobs(&self) -> ApiResult<Vec<TrainingJob>> {
        let value = self
            .send(Call::get("list_training_jobs", "/api/training/jobs"))
            .await?;
        Ok(serde_json::from_value(list_field(value, "jobs"))?)
    }

    /// 送出訓練設定，回傳工作 id。
    pub async fn start_training(&self, config: Value) -> ApiResult<String> {
        let value = self
            .send(Call::post("start_training", "/api/training/jobs").payload(config))
            .await?;
        extract_id(&value, &["id", "job_id", "jobId"])
    }

    pub async fn get_training_job(&self, job_id: &str) -> ApiResult<TrainingJob> {
        self.send_as(
            Call::get("get_training_job", format!("/api/training/jobs/{}", segment(job_id)))
                .id("jobId", job_id),
        )
        .await
    }

    /// 取得訓練日誌。後端可能回傳字串陣列或單一字串。
    pub async fn get_training_logs(&self, job_id: &str) -> ApiResult<Vec<String>> {
        let value = self
            .send(
                Call::get(
                    "get_training_logs",
                    format!("/api/training/jobs/{}/logs", segment(job_id)),
                )
                .id("jobId", job_id),
            )
            .await?;
        Ok(match list_field_or_text(value) {
            Value::Array(lines) => lines
                .into_iter()
                .map(|line| match line {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect(),
            Value::String(text) => text.lines().map(str::to_string).collect(),
            _ => Vec::new(),
        })
    }

    pub async fn cancel_training(&self, job_id: &str) -> ApiResult<Value> {
        self.send(
            Call::post(
                "cancel_training",
                format!("/api/training/jobs/{}/cancel", segment(job_id)),
            )
            .id("jobId", job_id),
        )
        .await
    }
}

fn list_field_or_text(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        Value::Object(ref map) if map.get("logs").is_some_and(Value::is_string) => {
            map.get("logs").cloned().unwrap_or(Value::Null)
        }
        other => list_field(other, "logs"),
    }
}
