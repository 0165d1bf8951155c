use serde_json::{Value, json};

use super::models::{AgentResult, DebateMessage, DebateStatus, RunStatus, RunSummary};
use super::{ApiClient, Call, extract_id, list_field, segment};
use crate::backend::error::ApiResult;

/// 多代理執行：平行腦力激盪與辯論。兩者都由後端追蹤，前端只負責啟動與輪詢。
impl ApiClient {
    /// 啟動平行腦力激盪，回傳執行 id。
    pub async fn start_parallel_run(&self, prompt: &str, profile_ids: &[String]) -> ApiResult<String> {
        let value = self
            .send(Call::post("start_parallel_run", "/api/runs/parallel").payload(json!({
                "prompt": prompt,
                "profile_ids": profile_ids,
            })))
            .await?;
        extract_id(&value, &["id", "run_id", "runId"])
    }

    pub async fn get_run(&self, run_id: &str) -> ApiResult<Value> {
        self.send(Call::get("get_run", format!("/api/runs/{}", segment(run_id))).id("runId", run_id))
            .await
    }

    /// 執行本身的狀態。紀錄可能直接回傳，也可能包在 `run` 欄位內。
    pub async fn get_run_status(&self, run_id: &str) -> ApiResult<RunStatus> {
        let value = self.get_run(run_id).await?;
        let record = match value {
            Value::Object(mut map) if map.get("run").is_some_and(Value::is_object) => {
                map.remove("run").unwrap_or_default()
            }
            other => other,
        };
        Ok(serde_json::from_value::<RunSummary>(record)?.status)
    }

    /// 取得每個代理目前的結果。
    pub async fn get_run_results(&self, run_id: &str) -> ApiResult<Vec<AgentResult>> {
        let value = self
            .send(
                Call::get("get_run_results", format!("/api/runs/{}/results", segment(run_id)))
                    .id("runId", run_id),
            )
            .await?;
        Ok(serde_json::from_value(list_field(value, "results"))?)
    }

    pub async fn cancel_run(&self, run_id: &str) -> ApiResult<Value> {
        self.send(
            Call::post("cancel_run", format!("/api/runs/{}/cancel", segment(run_id)))
                .id("runId", run_id),
        )
        .await
    }

    /// 啟動辯論，回傳辯論 id。
    pub async fn start_debate(&self, topic: &str, profile_ids: &[String], rounds: u32) -> ApiResult<String> {
        let value = self
            .send(Call::post("start_debate", "/api/debates").payload(json!({
                "topic": topic,
                "profile_ids": profile_ids,
                "rounds": rounds,
            })))
            .await?;
        extract_id(&value, &["id", "debate_id", "debateId"])
    }

    pub async fn get_debate_status(&self, debate_id: &str) -> ApiResult<DebateStatus> {
        self.send_as(
            Call::get("get_debate_status", format!("/api/debates/{}", segment(debate_id)))
                .id("debateId", debate_id),
        )
        .await
    }

    pub async fn get_debate_messages(&self, debate_id: &str) -> ApiResult<Vec<DebateMessage>> {
        let value = self
            .send(
                Call::get(
                    "get_debate_messages",
                    format!("/api/debates/{}/messages", segment(debate_id)),
                )
                .id("debateId", debate_id),
            )
            .await?;
        Ok(serde_json::from_value(list_field(value, "messages"))?)
    }

    /// 要求後端停止辯論。逾時處理由呼叫端（辯論控制器）負責。
    pub async fn stop_debate(&self, debate_id: &str) -> ApiResult<Value> {
        self.send(
            Call::post("stop_debate", format!("/api/debates/{}/stop", segment(debate_id)))
                .id("debateId", debate_id),
        )
        .await
    }
}
