//! agentdeck：多代理 AI 平台的終端用戶端。
//!
//! 後端（原生 sidecar 或本機 HTTP 伺服器）負責所有實際工作；
//! 這個 crate 負責找到後端、把每個能力包裝成非同步函式，
//! 並以輪詢與串流把長時間操作的狀態同步到畫面上。

pub mod app;
pub mod backend;
pub mod controllers;
pub mod event;
pub mod i18n;
pub mod logging;
pub mod store;
pub mod tui;
pub mod ui;
