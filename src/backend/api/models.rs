//! 控制器需要讀取欄位的後端紀錄。其餘資料一律以 `serde_json::Value` 傳遞。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 執行單位（平行執行、辯論、訓練）的狀態。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Complete,
    Failed,
    Cancelled,
    /// 後端回傳了未知的狀態字串。
    Other(String),
}

impl RunStatus {
    /// `complete`、`failed`、`cancelled` 為終止狀態，之後不再輪詢。
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed | RunStatus::Cancelled)
    }

    pub fn label(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Other(other) => other,
        }
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => RunStatus::Pending,
            "running" | "in_progress" => RunStatus::Running,
            "complete" | "completed" => RunStatus::Complete,
            "failed" | "error" => RunStatus::Failed,
            "cancelled" | "canceled" => RunStatus::Cancelled,
            _ => RunStatus::Other(value),
        }
    }
}

impl From<Option<String>> for RunStatus {
    fn from(value: Option<String>) -> Self {
        value.map(RunStatus::from).unwrap_or_default()
    }
}

impl From<RunStatus> for String {
    fn from(value: RunStatus) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 平行腦力激盪中單一代理的結果。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentResult {
    #[serde(alias = "profileId", alias = "agent_id", deserialize_with = "string_or_number")]
    pub profile_id: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default, deserialize_with = "loose_text")]
    pub output: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub error: Option<String>,
}

/// 執行本身的紀錄；只讀取狀態。
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub status: RunStatus,
}

/// 辯論的整體狀態。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DebateStatus {
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default, alias = "currentRound", deserialize_with = "null_as_default")]
    pub current_round: u32,
    #[serde(default, alias = "totalRounds", deserialize_with = "null_as_default")]
    pub total_rounds: u32,
    #[serde(default, deserialize_with = "loose_text")]
    pub error: Option<String>,
}

/// 辯論中的一則發言。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DebateMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "profileId", deserialize_with = "loose_text")]
    pub profile_id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub round: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, alias = "createdAt", deserialize_with = "loose_text")]
    pub created_at: Option<String>,
}

impl DebateMessage {
    /// 顯示用的發言者名稱。
    pub fn speaker_label(&self) -> &str {
        self.speaker
            .as_deref()
            .or(self.profile_id.as_deref())
            .unwrap_or("agent")
    }
}

/// 訓練工作的狀態。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingJob {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub status: RunStatus,
    /// 0.0 到 1.0 之間的進度。
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default, deserialize_with = "loose_text")]
    pub message: Option<String>,
}

/// 後端的 id 有時是字串、有時是數字，統一轉成字串。
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// `null` 視同缺欄位。
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 文字欄位接受任何 JSON：字串原樣保留，其他值轉成 JSON 文字，`null` 為 `None`。
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_parse_with_aliases() {
        let parse = |raw: &str| RunStatus::from(raw.to_string());
        assert_eq!(parse("complete"), RunStatus::Complete);
        assert_eq!(parse("Completed"), RunStatus::Complete);
        assert_eq!(parse("canceled"), RunStatus::Cancelled);
        assert_eq!(parse("thinking"), RunStatus::Other(String::from("thinking")));
        assert!(parse("failed").is_terminal());
        assert!(!parse("running").is_terminal());
        assert!(!parse("thinking").is_terminal());
    }

    #[test]
    fn records_tolerate_missing_and_numeric_fields() {
        let result: AgentResult = serde_json::from_value(json!({"profileId": 3})).unwrap();
        assert_eq!(result.profile_id, "3");
        assert_eq!(result.status, RunStatus::Pending);

        let message: DebateMessage =
            serde_json::from_value(json!({"id": 12, "round": 2, "content": "I disagree", "extra": true}))
                .unwrap();
        assert_eq!(message.id, "12");
        assert_eq!(message.speaker_label(), "agent");

        let job: TrainingJob =
            serde_json::from_value(json!({"id": "j1", "status": "running", "progress": 0.5})).unwrap();
        assert_eq!(job.status, RunStatus::Running);
    }

    #[test]
    fn null_status_and_round_fall_back_to_defaults() {
        let status: DebateStatus = serde_json::from_value(json!({
            "status": null,
            "current_round": null,
            "totalRounds": 4,
            "error": null
        }))
        .unwrap();
        assert_eq!(status.status, RunStatus::Pending);
        assert_eq!(status.current_round, 0);
        assert_eq!(status.total_rounds, 4);
        assert_eq!(status.error, None);

        let job: TrainingJob =
            serde_json::from_value(json!({"id": 5, "status": "completed", "progress": null, "message": null}))
                .unwrap();
        assert_eq!(job.progress, 0.0);
        assert!(job.status.is_terminal());
    }

    #[test]
    fn structured_output_is_kept_as_json_text() {
        let result: AgentResult = serde_json::from_value(json!({
            "profile_id": "a",
            "status": null,
            "output": {"summary": "ok", "score": 3},
            "error": 42
        }))
        .unwrap();
        assert_eq!(result.status, RunStatus::Pending);
        let output: Value = serde_json::from_str(result.output.as_deref().unwrap()).unwrap();
        assert_eq!(output, json!({"summary": "ok", "score": 3}));
        assert_eq!(result.error.as_deref(), Some("42"));
    }

    #[test]
    fn message_fields_accept_nulls() {
        let message: DebateMessage = serde_json::from_value(json!({
            "id": "m1",
            "profileId": null,
            "speaker": "Ada",
            "round": null,
            "content": null
        }))
        .unwrap();
        assert_eq!(message.round, 0);
        assert_eq!(message.content, "");
        assert_eq!(message.speaker_label(), "Ada");
    }
}
