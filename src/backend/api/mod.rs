//! API 門面：每個後端能力對應一個非同步函式。
//!
//! 每個函式都描述成一個 `Call`（原生指令名稱 + HTTP 方法與路徑 + 參數），
//! 由 `ApiClient::send` 依解析出的傳輸方式決定要呼叫原生指令還是送出 HTTP 請求。
//! 回應大多原樣以 `serde_json::Value` 傳回；控制器需要的欄位才有型別（見 `models`）。

mod assistant;
mod media;
pub mod models;
mod profiles;
mod providers;
mod runs;
mod sessions;
mod training;
mod users;

use std::sync::Arc;

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::backend::error::{ApiError, ApiResult};
use crate::backend::resolver::{Resolution, TransportResolver};

pub use assistant::{TokenStream, response_text};
pub use media::ExportFormat;

/// 單一後端呼叫在兩種傳輸方式下的描述。
#[derive(Debug, Clone)]
pub(crate) struct Call {
    /// 原生模式的指令名稱。
    command: &'static str,
    /// HTTP 模式的方法。
    method: Method,
    /// HTTP 模式的路徑（已代入 id）。
    path: String,
    /// 原生模式的 id 參數，鍵為 camelCase。
    ids: Vec<(&'static str, String)>,
    /// 請求內容；HTTP 當作 body，原生模式放在 `payload`。
    payload: Option<Value>,
}

impl Call {
    fn new(command: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            command,
            method,
            path: path.into(),
            ids: Vec::new(),
            payload: None,
        }
    }

    pub(crate) fn get(command: &'static str, path: impl Into<String>) -> Self {
        Self::new(command, Method::GET, path)
    }

    pub(crate) fn post(command: &'static str, path: impl Into<String>) -> Self {
        Self::new(command, Method::POST, path)
    }

    pub(crate) fn put(command: &'static str, path: impl Into<String>) -> Self {
        Self::new(command, Method::PUT, path)
    }

    pub(crate) fn delete(command: &'static str, path: impl Into<String>) -> Self {
        Self::new(command, Method::DELETE, path)
    }

    /// 記錄一個路徑 id，原生模式會以 `key` 傳遞。
    pub(crate) fn id(mut self, key: &'static str, value: &str) -> Self {
        self.ids.push((key, value.to_string()));
        self
    }

    pub(crate) fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// 原生指令的參數物件：id 欄位加上可選的 `payload`。
    pub(crate) fn native_args(&self) -> Value {
        let mut args = Map::new();
        for (key, value) in &self.ids {
            args.insert((*key).to_string(), Value::String(value.clone()));
        }
        if let Some(payload) = &self.payload {
            args.insert(String::from("payload"), payload.clone());
        }
        Value::Object(args)
    }

    pub(crate) fn command(&self) -> &'static str {
        self.command
    }

    pub(crate) fn http_path(&self) -> &str {
        &self.path
    }
}

/// 將路徑片段做百分比編碼，只保留 RFC 3986 的非保留字元。
pub(crate) fn segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// 前端唯一的後端入口。可以自由複製，內部共用同一個解析器。
#[derive(Clone)]
pub struct ApiClient {
    resolver: Arc<TransportResolver>,
}

impl ApiClient {
    pub fn new(resolver: Arc<TransportResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<TransportResolver> {
        &self.resolver
    }

    /// 依目前的傳輸方式執行呼叫。
    pub(crate) async fn send(&self, call: Call) -> ApiResult<Value> {
        debug!("backend call {}", call.command());
        match self.resolver.resolve().await {
            Resolution::Native(bridge) => bridge.invoke(call.command, call.native_args()).await,
            Resolution::Http(transport) => {
                transport
                    .request(call.method.clone(), call.http_path(), call.payload.as_ref())
                    .await
            }
            Resolution::Unreachable => Err(ApiError::Unreachable),
        }
    }

    /// 執行呼叫並解析成指定型別。
    pub(crate) async fn send_as<T: DeserializeOwned>(&self, call: Call) -> ApiResult<T> {
        let value = self.send(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 後端健康檢查。
    pub async fn health(&self) -> ApiResult<Value> {
        self.send(Call::get("health", "/api/health")).await
    }
}

/// 從回應中取出清單：接受純陣列，或是包在 `key` 欄位內的陣列。
pub(crate) fn list_field(value: Value, key: &str) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    }
}

/// 從建立資源的回應中取出 id，依序嘗試多個欄位名稱。
pub(crate) fn extract_id(value: &Value, keys: &[&str]) -> ApiResult<String> {
    for key in keys {
        match value.get(*key) {
            Some(Value::String(id)) if !id.is_empty() => return Ok(id.clone()),
            Some(Value::Number(id)) => return Ok(id.to_string()),
            _ => {}
        }
    }
    match value {
        Value::String(id) if !id.is_empty() => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(ApiError::Malformed(format!(
            "missing id (expected one of: {})",
            keys.join(", ")
        ))),
    }
}
