use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 指定 HTTP 後端基礎 URL 的環境變數，設定後會取代連接埠探測。
pub const API_URL_ENV: &str = "AGENTDECK_API_URL";
/// 指定原生後端（sidecar）執行檔的環境變數。
pub const NATIVE_BACKEND_ENV: &str = "AGENTDECK_NATIVE_BACKEND";
/// 指定設定檔路徑的環境變數。
pub const CONFIG_PATH_ENV: &str = "AGENTDECK_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/agentdeck.toml";

/// 用戶端設定的頂層結構，通常從 `config/agentdeck.toml` 載入。
/// 所有欄位都有預設值，因此空檔案或缺檔都能正常啟動。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 後端連線方式的設定。
    pub backend: BackendSettings,
    /// 輪詢、串流與停止請求的時間參數。
    pub timing: TimingSettings,
    /// 本地持久化狀態（local storage）的位置。
    pub storage: StorageSettings,
}

impl ClientSettings {
    /// 從工作目錄讀取設定，並套用環境變數覆寫。
    ///
    /// 讀取順序：`AGENTDECK_CONFIG` 指定的檔案 > `config/agentdeck.toml` > 內建預設值。
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace_root.join(DEFAULT_CONFIG_PATH));
        let mut settings = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings.normalize(workspace_root))
    }

    /// 解析單一設定檔，不套用任何覆寫。
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read client config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse client config: {}", path.display()))
    }

    /// 套用環境變數覆寫。`lookup` 抽離出來是為了在測試中不必修改行程環境。
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.backend.api_base_url = Some(url.trim().to_string());
        }
        if let Some(program) = lookup(NATIVE_BACKEND_ENV).filter(|value| !value.trim().is_empty())
        {
            self.backend.native_program = Some(program.trim().to_string());
        }
    }

    /// 把相對路徑轉成相對於工作目錄的絕對路徑。
    fn normalize(mut self, workspace_root: &Path) -> Self {
        if let Some(program) = self.backend.native_program.as_mut() {
            let path = Path::new(program.as_str());
            if path.is_relative() {
                let candidate = workspace_root.join(path);
                if candidate.exists() {
                    *program = candidate.to_string_lossy().into();
                }
            }
        }
        if let Some(path) = self.storage.path.as_mut()
            && path.is_relative()
        {
            *path = workspace_root.join(&path);
        }
        self
    }

    /// local storage 檔案的最終路徑。
    pub fn local_storage_path(&self, workspace_root: &Path) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        dirs::config_dir()
            .map(|dir| dir.join("agentdeck").join("local_storage.json"))
            .unwrap_or_else(|| workspace_root.join("config/local_storage.json"))
    }
}

/// 後端探測與原生 sidecar 的設定。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// 原生後端執行檔。設定後且找得到檔案時，一律使用原生模式。
    pub native_program: Option<String>,
    /// 傳給原生後端的命令列參數。
    pub native_args: Vec<String>,
    /// 原生後端的額外環境變數。
    pub native_env: BTreeMap<String, String>,
    /// 直接指定的 HTTP 基礎 URL，會取代連接埠探測。
    pub api_base_url: Option<String>,
    /// 探測用的主機名稱。
    pub host: String,
    /// 依序探測的候選連接埠。
    pub candidate_ports: Vec<u16>,
    /// 健康檢查路徑。
    pub health_path: String,
    /// 每個候選連接埠的探測逾時（毫秒）。
    pub probe_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            native_program: None,
            native_args: Vec::new(),
            native_env: BTreeMap::new(),
            api_base_url: None,
            host: String::from("127.0.0.1"),
            candidate_ports: vec![8000, 8001, 8080, 5000],
            health_path: String::from("/api/health"),
            probe_timeout_ms: 2_000,
        }
    }
}

impl BackendSettings {
    /// 依探測順序列出 HTTP 候選基礎 URL。
    /// 有指定 `api_base_url` 時，它是唯一的候選。
    pub fn candidate_base_urls(&self) -> Vec<String> {
        if let Some(url) = &self.api_base_url {
            return vec![url.trim_end_matches('/').to_string()];
        }
        self.candidate_ports
            .iter()
            .map(|port| format!("http://{}:{}", self.host, port))
            .collect()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// 找出原生後端執行檔的實際路徑；找不到時視為沒有原生執行環境。
    pub fn native_command(&self) -> Option<PathBuf> {
        let program = self.native_program.as_deref()?.trim();
        if program.is_empty() {
            return None;
        }
        let direct = PathBuf::from(program);
        if direct.is_file() {
            return Some(direct);
        }
        find_command(program)
    }
}

/// 時間相關參數。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// 辯論與平行腦力激盪的輪詢間隔。
    pub poll_interval_ms: u64,
    /// 訓練工作的輪詢間隔。
    pub training_poll_interval_ms: u64,
    /// 串流在多久沒有結束時改用一次性呼叫。
    pub stream_timeout_secs: u64,
    /// 停止辯論請求的逾時。
    pub stop_timeout_secs: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            training_poll_interval_ms: 2_000,
            stream_timeout_secs: 120,
            stop_timeout_secs: 8,
        }
    }
}

impl TimingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn training_poll_interval(&self) -> Duration {
        Duration::from_millis(self.training_poll_interval_ms.max(1))
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: Option<PathBuf>,
}

/// 在系統 PATH 中尋找指定的命令。
fn find_command(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;

    #[cfg(windows)]
    {
        let exts = [".exe", ".bat", ".cmd"];
        for dir in env::split_paths(&path_var) {
            let direct = dir.join(name);
            if direct.is_file() {
                return Some(direct);
            }
            for ext in &exts {
                let candidate = dir.join(format!("{}{}", name, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    #[cfg(not(windows))]
    {
        env::split_paths(&path_var)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file() && is_executable(candidate))
    }
}

/// 檢查檔案是否具有可執行權限 (僅限非 Windows 系統)。
#[cfg(not(windows))]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(metadata) => metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings: ClientSettings = toml::from_str("").unwrap();
        assert_eq!(settings.backend.candidate_ports, vec![8000, 8001, 8080, 5000]);
        assert_eq!(settings.timing.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.timing.stream_timeout(), Duration::from_secs(120));
        assert_eq!(settings.timing.stop_timeout(), Duration::from_secs(8));
        assert!(settings.backend.native_program.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"
            [backend]
            candidate_ports = [9100, 9200]

            [timing]
            stop_timeout_secs = 3
        "#;
        let settings: ClientSettings = toml::from_str(raw).unwrap();
        assert_eq!(
            settings.backend.candidate_base_urls(),
            vec!["http://127.0.0.1:9100", "http://127.0.0.1:9200"]
        );
        assert_eq!(settings.backend.health_path, "/api/health");
        assert_eq!(settings.timing.stop_timeout_secs, 3);
        assert_eq!(settings.timing.poll_interval_ms, 1_000);
    }

    #[test]
    fn api_url_override_replaces_port_candidates() {
        let mut settings = ClientSettings::default();
        settings.apply_overrides(|key| match key {
            API_URL_ENV => Some(String::from("http://10.0.0.5:9000/")),
            _ => None,
        });
        assert_eq!(
            settings.backend.candidate_base_urls(),
            vec!["http://10.0.0.5:9000"]
        );
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut settings = ClientSettings::default();
        settings.apply_overrides(|_| Some(String::from("   ")));
        assert!(settings.backend.api_base_url.is_none());
        assert!(settings.backend.native_program.is_none());
    }

    #[test]
    fn missing_native_program_is_not_present() {
        let backend = BackendSettings {
            native_program: Some(String::from("/definitely/not/here/agentdeck-sidecar")),
            ..BackendSettings::default()
        };
        assert!(backend.native_command().is_none());
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentdeck.toml");
        fs::write(&path, "[backend]\ncandidate_ports = [7000]\n").unwrap();

        let loaded = ClientSettings::from_file(&path).unwrap();
        assert_eq!(loaded.backend.candidate_ports, vec![7000]);
        assert!(ClientSettings::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
