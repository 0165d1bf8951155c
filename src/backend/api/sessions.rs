use serde_json::Value;

use super::{ApiClient, Call, list_field, segment};
use crate::backend::error::ApiResult;

impl ApiClient {
    pub async fn list_sessions(&self) -> ApiResult<Value> {
        let value = self.send(Call::get("list_sessions", "/api/sessions")).await?;
        Ok(list_field(value, "sessions"))
    }

    pub async fn create_session(&self, session: Value) -> ApiResult<Value> {
        self.send(Call::post("create_session", "/api/sessions").payload(session))
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> ApiResult<Value> {
        self.send(
            Call::get("get_session", format!("/api/sessions/{}", segment(session_id)))
                .id("sessionId", session_id),
        )
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> ApiResult<Value> {
        self.send(
            Call::delete("delete_session", format!("/api/sessions/{}", segment(session_id)))
                .id("sessionId", session_id),
        )
        .await
    }

    pub async fn list_messages(&self, session_id: &str) -> ApiResult<Value> {
        let value = self
            .send(
                Call::get(
                    "list_messages",
                    format!("/api/sessions/{}/messages", segment(session_id)),
                )
                .id("sessionId", session_id),
            )
            .await?;
        Ok(list_field(value, "messages"))
    }

    pub async fn send_message(&self, session_id: &str, message: Value) -> ApiResult<Value> {
        self.send(
            Call::post(
                "send_message",
                format!("/api/sessions/{}/messages", segment(session_id)),
            )
            .id("sessionId", session_id)
            .payload(message),
        )
        .await
    }
}
