//! `app` 模組是 agentdeck 終端介面的核心。
//!
//! 它負責管理應用程式的整體狀態、處理鍵盤輸入，
//! 並把背景任務的結果套用回畫面狀態。

/// `actions` 模組：會呼叫後端的使用者動作，全部在背景任務中執行。
mod actions;
/// `init` 模組：`App` 的建立、背景初始化，以及錯誤後的重新載入與重設。
mod init;
/// `keyboard` 模組：專門處理所有的鍵盤輸入事件。
mod keyboard;
/// `state` 模組：定義 `App` 結構以及畫面、輸入列等狀態類型。
mod state;
/// `tick` 模組：處理應用程式的定時更新事件（tick）。
mod tick;

pub use state::{App, AppEvent, Controllers, HTTP_MODE_WARNING, PromptComposer, Screen};
