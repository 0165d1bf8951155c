use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use reqwest::Client;
use tokio::sync::OnceCell;

use crate::backend::config::BackendSettings;
use crate::backend::transport::NativeBridge;
use crate::backend::transport::http::{self, HttpTransport};
use crate::backend::transport::native::SidecarBridge;

/// 本次工作階段採用的傳輸方式。
#[derive(Clone)]
pub enum Resolution {
    /// 原生執行環境存在。
    Native(Arc<dyn NativeBridge>),
    /// 找到可用的 HTTP 伺服器。
    Http(HttpTransport),
    /// 什麼都找不到；本次工作階段不會再重試。
    Unreachable,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Native(bridge) => write!(f, "Native({})", bridge.name()),
            Resolution::Http(transport) => write!(f, "Http({})", transport.base_url()),
            Resolution::Unreachable => f.write_str("Unreachable"),
        }
    }
}

/// 簡化後的模式描述，給 UI 與日誌使用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Native,
    Http(String),
    Unreachable,
}

/// 決定並記住本次工作階段要使用的後端。
///
/// 第一次呼叫 `resolve` 時才會探測；之後（包括失敗的結果）都直接回傳快取。
/// 同時發生的第一批呼叫會共用同一次探測。
pub struct TransportResolver {
    settings: BackendSettings,
    native: Option<Arc<dyn NativeBridge>>,
    client: Client,
    resolved: OnceCell<Resolution>,
}

impl TransportResolver {
    /// 建立解析器。`native` 為 `Some` 時一律採用原生模式，不做任何 HTTP 探測。
    pub fn new(settings: BackendSettings, native: Option<Arc<dyn NativeBridge>>, client: Client) -> Self {
        Self {
            settings,
            native,
            client,
            resolved: OnceCell::new(),
        }
    }

    /// 依設定偵測原生執行環境：執行檔存在且能啟動時才算存在。
    ///
    /// 必須在 tokio 執行環境內呼叫。
    pub fn detect_native(settings: &BackendSettings) -> Option<Arc<dyn NativeBridge>> {
        let program = settings.native_command()?;
        match SidecarBridge::start(&program, &settings.native_args, &settings.native_env) {
            Ok(bridge) => {
                info!("native backend detected at {}", program.display());
                Some(Arc::new(bridge))
            }
            Err(err) => {
                warn!("native backend present but failed to start: {err:#}");
                None
            }
        }
    }

    /// 以設定建立解析器，原生執行環境自動偵測。
    pub fn from_settings(settings: BackendSettings) -> Self {
        let native = Self::detect_native(&settings);
        Self::new(settings, native, Client::new())
    }

    pub async fn resolve(&self) -> &Resolution {
        self.resolved.get_or_init(|| self.discover()).await
    }

    async fn discover(&self) -> Resolution {
        if let Some(bridge) = &self.native {
            info!("using native backend {}", bridge.name());
            return Resolution::Native(bridge.clone());
        }
        let timeout = self.settings.probe_timeout();
        for base in self.settings.candidate_base_urls() {
            if http::probe(&self.client, &base, &self.settings.health_path, timeout).await {
                info!("using HTTP backend at {}", base);
                return Resolution::Http(HttpTransport::new(self.client.clone(), base));
            }
        }
        warn!(
            "no backend reachable (tried {} candidate(s)); staying offline for this session",
            self.settings.candidate_base_urls().len()
        );
        Resolution::Unreachable
    }

    /// 後端是否可用。會在需要時觸發第一次探測。
    pub async fn is_reachable(&self) -> bool {
        !matches!(self.resolve().await, Resolution::Unreachable)
    }

    /// HTTP 模式下的基礎 URL；原生模式或無法連線時為 `None`。
    pub async fn base_url(&self) -> Option<String> {
        match self.resolve().await {
            Resolution::Http(transport) => Some(transport.base_url().to_string()),
            _ => None,
        }
    }

    pub async fn mode(&self) -> TransportMode {
        match self.resolve().await {
            Resolution::Native(_) => TransportMode::Native,
            Resolution::Http(transport) => TransportMode::Http(transport.base_url().to_string()),
            Resolution::Unreachable => TransportMode::Unreachable,
        }
    }

    /// 不觸發探測，只回報目前已知的結果。
    pub fn peek(&self) -> Option<&Resolution> {
        self.resolved.get()
    }
}
