use serde_json::Value;

use super::{ApiClient, Call, list_field, segment};
use crate::backend::error::ApiResult;

/// 代理個人資料（profile）：名稱、角色提示詞、使用的供應商與模型。
impl ApiClient {
    pub async fn list_profiles(&self) -> ApiResult<Value> {
        let value = self.send(Call::get("list_profiles", "/api/profiles")).await?;
        Ok(list_field(value, "profiles"))
    }

    pub async fn get_profile(&self, profile_id: &str) -> ApiResult<Value> {
        self.send(
            Call::get("get_profile", format!("/api/profiles/{}", segment(profile_id)))
                .id("profileId", profile_id),
        )
        .await
    }

    pub async fn create_profile(&self, profile: Value) -> ApiResult<Value> {
        self.send(Call::post("create_profile", "/api/profiles").payload(profile))
            .await
    }

    pub async fn update_profile(&self, profile_id: &str, profile: Value) -> ApiResult<Value> {
        self.send(
            Call::put("update_profile", format!("/api/profiles/{}", segment(profile_id)))
                .id("profileId", profile_id)
                .payload(profile),
        )
        .await
    }

    pub async fn delete_profile(&self, profile_id: &str) -> ApiResult<Value> {
        self.send(
            Call::delete("delete_profile", format!("/api/profiles/{}", segment(profile_id)))
                .id("profileId", profile_id),
        )
        .await
    }
}
