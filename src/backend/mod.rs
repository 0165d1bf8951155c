//! 與後端溝通的所有元件。
//!
//! 此模組負責找到可用的後端、把每個後端能力包裝成函式，
//! 以及長時間操作（串流、輪詢）的共用機制。

/// `config` 模組：`config/agentdeck.toml` 的解析格式與環境變數覆寫。
pub mod config;
/// `error` 模組：API 門面的錯誤類型。
pub mod error;
/// `transport` 模組：原生 sidecar 與 HTTP 兩種傳輸方式。
pub mod transport;
/// `resolver` 模組：每個工作階段決定一次要使用哪個後端。
pub mod resolver;
/// `api` 模組：`ApiClient`，每個後端能力一個函式。
pub mod api;
/// `stream` 模組：逐字輸出與逾時降級。
pub mod stream;
/// `poll` 模組：固定間隔的輪詢迴圈。
pub mod poll;

pub use api::ApiClient;
pub use config::ClientSettings;
pub use error::{ApiError, ApiResult};
pub use poll::{PollHandle, PollStep, spawn_poller};
pub use resolver::{Resolution, TransportMode, TransportResolver};
pub use stream::{ChatBackend, StreamEvent, StreamPhase, StreamState, StreamingChat};
pub use transport::{NativeBridge, NativeEvent};
