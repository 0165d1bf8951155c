pub trait Strings {
    fn dashboard_title(&self) -> &'static str;
    fn brainstorm_title(&self) -> &'static str;
    fn debate_title(&self) -> &'static str;
    fn training_title(&self) -> &'static str;
    fn assistant_title(&self) -> &'static str;
    fn unreachable_banner(&self) -> &'static str;
    fn http_mode_notice(&self) -> &'static str;
    fn recovery_title(&self) -> &'static str;
    fn recovery_help(&self) -> &'static str;
    fn prompt_placeholder(&self) -> &'static str;
    fn key_help(&self) -> &'static str;
}

pub struct English;
impl Strings for English {
    fn dashboard_title(&self) -> &'static str { "Dashboard" }
    fn brainstorm_title(&self) -> &'static str { "Brainstorm" }
    fn debate_title(&self) -> &'static str { "Debate" }
    fn training_title(&self) -> &'static str { "Training" }
    fn assistant_title(&self) -> &'static str { "Assistant" }
    fn unreachable_banner(&self) -> &'static str {
        "Backend unreachable: start the API server or set AGENTDECK_API_URL."
    }
    fn http_mode_notice(&self) -> &'static str {
        "Running in HTTP mode; native features are unavailable. (F4 to dismiss)"
    }
    fn recovery_title(&self) -> &'static str { "Something went wrong" }
    fn recovery_help(&self) -> &'static str { "r: reload   x: reset local data   q: quit" }
    fn prompt_placeholder(&self) -> &'static str { "Type a prompt and press Enter" }
    fn key_help(&self) -> &'static str {
        "Tab switch  Ctrl+S stop  Ctrl+X cancel  F2 theme  F3 language  Ctrl+Q quit"
    }
}

pub struct SimplifiedChinese;
impl Strings for SimplifiedChinese {
    fn dashboard_title(&self) -> &'static str { "总览" }
    fn brainstorm_title(&self) -> &'static str { "头脑风暴" }
    fn debate_title(&self) -> &'static str { "辩论" }
    fn training_title(&self) -> &'static str { "训练" }
    fn assistant_title(&self) -> &'static str { "编程助手" }
    fn unreachable_banner(&self) -> &'static str {
        "无法连接后端：请启动 API 服务器或设置 AGENTDECK_API_URL。"
    }
    fn http_mode_notice(&self) -> &'static str { "正以 HTTP 模式运行，原生功能不可用。（F4 关闭）" }
    fn recovery_title(&self) -> &'static str { "发生错误" }
    fn recovery_help(&self) -> &'static str { "r：重新加载   x：清除本地数据   q：退出" }
    fn prompt_placeholder(&self) -> &'static str { "输入提示后按 Enter" }
    fn key_help(&self) -> &'static str {
        "Tab 切换  Ctrl+S 停止  Ctrl+X 取消  F2 主题  F3 语言  Ctrl+Q 退出"
    }
}

pub struct TraditionalChinese;
impl Strings for TraditionalChinese {
    fn dashboard_title(&self) -> &'static str { "總覽" }
    fn brainstorm_title(&self) -> &'static str { "腦力激盪" }
    fn debate_title(&self) -> &'static str { "辯論" }
    fn training_title(&self) -> &'static str { "訓練" }
    fn assistant_title(&self) -> &'static str { "程式助理" }
    fn unreachable_banner(&self) -> &'static str {
        "無法連線到後端：請啟動 API 伺服器或設定 AGENTDECK_API_URL。"
    }
    fn http_mode_notice(&self) -> &'static str { "目前以 HTTP 模式執行，原生功能無法使用。（F4 關閉）" }
    fn recovery_title(&self) -> &'static str { "發生錯誤" }
    fn recovery_help(&self) -> &'static str { "r：重新載入   x：清除本地資料   q：離開" }
    fn prompt_placeholder(&self) -> &'static str { "輸入提示後按 Enter" }
    fn key_help(&self) -> &'static str {
        "Tab 切換  Ctrl+S 停止  Ctrl+X 取消  F2 主題  F3 語言  Ctrl+Q 離開"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    SimplifiedChinese,
    TraditionalChinese,
}

impl Language {
    pub fn next(self) -> Self {
        match self {
            Language::English => Language::SimplifiedChinese,
            Language::SimplifiedChinese => Language::TraditionalChinese,
            Language::TraditionalChinese => Language::English,
        }
    }

    pub fn strings(self) -> &'static dyn Strings {
        match self {
            Language::English => &English,
            Language::SimplifiedChinese => &SimplifiedChinese,
            Language::TraditionalChinese => &TraditionalChinese,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::SimplifiedChinese => "简体中文",
            Language::TraditionalChinese => "繁體中文",
        }
    }
}
