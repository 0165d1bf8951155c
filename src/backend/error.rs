/// API 門面回傳的錯誤類型。
///
/// 呼叫端（控制器或畫面）負責把它轉成使用者可讀的訊息，
/// 因此 `Display` 的內容應該可以直接顯示在狀態列。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 沒有找到任何可用的後端（原生或 HTTP）。
    #[error("backend unreachable: no native runtime or HTTP server responded")]
    Unreachable,
    /// HTTP 回應不是 2xx。`message` 優先使用伺服器提供的說明。
    #[error("{message}")]
    Http { status: u16, message: String },
    /// 網路層錯誤（連線失敗、逾時等），直接保留 `reqwest` 的錯誤。
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    /// 原生後端回傳的錯誤，原樣傳遞。
    #[error("{0}")]
    Native(String),
    /// 回應內容無法解析。
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
    /// 回應格式正確但缺少必要內容。
    #[error("unexpected backend response: {0}")]
    Malformed(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 由 HTTP 狀態碼與回應內容組出錯誤。
    ///
    /// 依序嘗試 JSON 內的 `error`、`message`、`detail` 欄位，
    /// 其次使用原始文字，最後退回狀態碼的標準說明。
    pub fn from_http(status: reqwest::StatusCode, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        });
        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) if !text.is_empty() => {
                    return Some(text.clone());
                }
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn prefers_server_error_field() {
        let err = ApiError::from_http(StatusCode::BAD_REQUEST, r#"{"error":"name is required"}"#);
        assert_eq!(err.to_string(), "name is required");
        assert!(matches!(err, ApiError::Http { status: 400, .. }));
    }

    #[test]
    fn falls_back_to_detail_then_status_text() {
        let err = ApiError::from_http(StatusCode::NOT_FOUND, r#"{"detail":"no such run"}"#);
        assert_eq!(err.to_string(), "no such run");

        let err = ApiError::from_http(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.to_string(), "Service Unavailable");

        let err = ApiError::from_http(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn plain_text_body_is_used_verbatim() {
        let err = ApiError::from_http(StatusCode::BAD_GATEWAY, "upstream exploded\n");
        assert_eq!(err.to_string(), "upstream exploded");
    }
}
