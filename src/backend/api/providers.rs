use serde_json::Value;

use super::{ApiClient, Call, list_field, segment};
use crate::backend::error::ApiResult;

/// AI 供應商憑證的管理。憑證內容由後端保管，這裡只負責傳遞。
impl ApiClient {
    pub async fn list_providers(&self) -> ApiResult<Value> {
        let value = self.send(Call::get("list_providers", "/api/providers")).await?;
        Ok(list_field(value, "providers"))
    }

    pub async fn create_provider(&self, provider: Value) -> ApiResult<Value> {
        self.send(Call::post("create_provider", "/api/providers").payload(provider))
            .await
    }

    pub async fn update_provider(&self, provider_id: &str, provider: Value) -> ApiResult<Value> {
        self.send(
            Call::put(
                "update_provider",
                format!("/api/providers/{}", segment(provider_id)),
            )
            .id("providerId", provider_id)
            .payload(provider),
        )
        .await
    }

    pub async fn delete_provider(&self, provider_id: &str) -> ApiResult<Value> {
        self.send(
            Call::delete(
                "delete_provider",
                format!("/api/providers/{}", segment(provider_id)),
            )
            .id("providerId", provider_id),
        )
        .await
    }

    /// 請後端以目前的憑證實際連線一次供應商。
    pub async fn test_provider(&self, provider_id: &str) -> ApiResult<Value> {
        self.send(
            Call::post(
                "test_provider",
                format!("/api/providers/{}/test", segment(provider_id)),
            )
            .id("providerId", provider_id),
        )
        .await
    }

    pub async fn list_provider_models(&self, provider_id: &str) -> ApiResult<Value> {
        let value = self
            .send(
                Call::get(
                    "list_provider_models",
                    format!("/api/providers/{}/models", segment(provider_id)),
                )
                .id("providerId", provider_id),
            )
            .await?;
        Ok(list_field(value, "models"))
    }
}
