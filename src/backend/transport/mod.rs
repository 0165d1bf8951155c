//! `transport` 模組負責與後端實際通訊的兩種方式。
//!
//! - `native`：透過打包好的桌面執行環境（sidecar 程序）以 stdio 交換 JSON 指令與事件。
//! - `http`：透過本地 REST 伺服器（瀏覽器模式）。
//!
//! 選擇哪一種由 `resolver` 在每個工作階段決定一次。

/// `http` 模組：REST 請求、健康檢查探測與 SSE 串流。
pub mod http;
/// `native` 模組：sidecar 程序的指令呼叫與事件訂閱。
pub mod native;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::backend::error::ApiResult;

/// 原生後端推送的事件（例如串流 token）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeEvent {
    /// 事件名稱，例如 `assistant-token`。
    pub event: String,
    /// 事件內容，格式由後端決定。
    #[serde(default)]
    pub payload: Value,
}

/// 原生執行環境必須提供的介面。
///
/// 抽成 trait 讓解析器與 API 門面不必知道 sidecar 的細節，
/// 測試時也能換成記憶體內的假實作。
#[async_trait]
pub trait NativeBridge: Send + Sync {
    /// 回傳此執行環境的名稱，用於 UI 顯示或日誌記錄。
    fn name(&self) -> &str;

    /// 呼叫一個具名指令並等待結果。
    ///
    /// # Arguments
    /// * `command` - 指令名稱，例如 `list_providers`。
    /// * `args` - 以 camelCase 命名的參數物件。
    async fn invoke(&self, command: &str, args: Value) -> ApiResult<Value>;

    /// 訂閱後端推送的事件。取消訂閱只要丟棄接收端即可。
    fn subscribe(&self) -> broadcast::Receiver<NativeEvent>;
}
