use serde_json::Value;

use super::{ApiClient, Call, list_field, segment};
use crate::backend::error::ApiResult;

impl ApiClient {
    pub async fn list_users(&self) -> ApiResult<Value> {
        let value = self.send(Call::get("list_users", "/api/users")).await?;
        Ok(list_field(value, "users"))
    }

    pub async fn get_user(&self, user_id: &str) -> ApiResult<Value> {
        self.send(
            Call::get("get_user", format!("/api/users/{}", segment(user_id))).id("userId", user_id),
        )
        .await
    }

    pub async fn create_user(&self, user: Value) -> ApiResult<Value> {
        self.send(Call::post("create_user", "/api/users").payload(user))
            .await
    }
}
