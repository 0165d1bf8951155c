use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiClient, Call, segment};
use crate::backend::error::{ApiError, ApiResult};

/// 對話匯出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ApiClient {
    /// 匯出對話，回傳後端產生的內容（通常是 `{ "content": ..., "filename": ... }`）。
    pub async fn export_session(&self, session_id: &str, format: ExportFormat) -> ApiResult<Value> {
        self.send(
            Call::post(
                "export_session",
                format!("/api/sessions/{}/export", segment(session_id)),
            )
            .id("sessionId", session_id)
            .payload(json!({ "format": format })),
        )
        .await
    }

    /// 語音轉文字。音訊以 base64 傳送。
    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> ApiResult<String> {
        let value = self
            .send(Call::post("transcribe_audio", "/api/voice/transcribe").payload(json!({
                "audio": STANDARD.encode(audio),
                "mime_type": mime_type,
            })))
            .await?;
        match value {
            Value::String(text) => Ok(text),
            other => other
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Malformed(String::from("transcription without text"))),
        }
    }

    /// 文字轉語音，回傳解碼後的音訊位元組。
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> ApiResult<Vec<u8>> {
        let value = self
            .send(Call::post("synthesize_speech", "/api/voice/speak").payload(json!({
                "text": text,
                "voice": voice,
            })))
            .await?;
        let encoded = match &value {
            Value::String(audio) => audio.as_str(),
            other => other
                .get("audio")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Malformed(String::from("speech without audio")))?,
        };
        STANDARD
            .decode(encoded)
            .map_err(|err| ApiError::Malformed(format!("invalid audio encoding: {err}")))
    }
}
