//! 各畫面的長時間操作控制器。
//!
//! 每個控制器擁有自己的背景任務，透過 `watch` 通道發布快照；
//! UI 在每個 tick 讀取最新快照即可，不需要等待任何請求。

/// `assistant` 模組：程式助理的對話紀錄與逐字輸出。
pub mod assistant;
/// `brainstorm` 模組：平行執行多個代理並輪詢各自的結果。
pub mod brainstorm;
/// `debate` 模組：多代理辯論的輪詢與有時限的停止。
pub mod debate;
/// `training` 模組：訓練工作的進度追蹤。
pub mod training;

pub use assistant::{AssistantController, Transcript, TranscriptEntry};
pub use brainstorm::{BrainstormApi, BrainstormController, BrainstormSnapshot};
pub use debate::{DebateApi, DebateController, DebateSnapshot, STOP_TIMED_OUT, StopOutcome};
pub use training::{TrainingApi, TrainingController, TrainingSnapshot};
