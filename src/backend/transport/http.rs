use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;

use crate::backend::error::{ApiError, ApiResult};

/// SSE `data:` 內容組成的串流。
pub type SseStream = Pin<Box<dyn Stream<Item = ApiResult<String>> + Send>>;

/// 瀏覽器模式下與本地 REST 伺服器溝通的傳輸層。
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 送出 JSON 請求並回傳 JSON 結果。
    ///
    /// 非 2xx 的回應會轉成 `ApiError::Http`；空的成功回應視為 `null`。
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        debug!("{} {}", method, path);
        let mut builder = self
            .client
            .request(method, self.url(path))
            .headers(json_headers());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_http(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// 開啟一個 SSE 串流，逐一回傳每個事件的 `data:` 內容。
    pub async fn open_sse(&self, path: &str, body: &Value) -> ApiResult<SseStream> {
        let mut headers = json_headers();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        let response = self
            .client
            .post(self.url(path))
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_http(status, &text));
        }

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => buffer.extend_from_slice(&chunk),
                    Err(err) => {
                        yield Err(ApiError::Network(err));
                        return;
                    }
                }
                while let Some(frame) = extract_sse_frame(&mut buffer) {
                    if let Some(data) = sse_data(&String::from_utf8_lossy(&frame)) {
                        yield Ok(data);
                    }
                }
            }
            if let Some(data) = sse_data(&String::from_utf8_lossy(&buffer)) {
                yield Ok(data);
            }
        }))
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// 對單一候選位址做健康檢查，2xx 即視為可用。
pub async fn probe(client: &Client, base_url: &str, health_path: &str, timeout: Duration) -> bool {
    let url = format!("{}{}", base_url.trim_end_matches('/'), health_path);
    match client.get(&url).timeout(timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            debug!("probe {} failed: {}", url, err);
            false
        }
    }
}

/// 從緩衝區切出一個以空行結尾的 SSE frame。
fn extract_sse_frame(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| (pos, 4));
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2));
    let (pos, delimiter_len) = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    let frame = buffer.drain(..pos).collect::<Vec<u8>>();
    buffer.drain(..delimiter_len);
    Some(frame)
}

/// 取出 frame 中所有 `data:` 行並以換行接起來；註解行（`:` 開頭）忽略。
fn sse_data(frame: &str) -> Option<String> {
    let parts: Vec<&str> = frame
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_on_blank_lines() {
        let mut buffer = b"data: {\"chunk\":\"a\"}\n\ndata: {\"chunk\":\"b\"}\r\n\r\ndata: tail".to_vec();
        let first = extract_sse_frame(&mut buffer).unwrap();
        assert_eq!(sse_data(&String::from_utf8_lossy(&first)).unwrap(), "{\"chunk\":\"a\"}");
        let second = extract_sse_frame(&mut buffer).unwrap();
        assert_eq!(sse_data(&String::from_utf8_lossy(&second)).unwrap(), "{\"chunk\":\"b\"}");
        assert!(extract_sse_frame(&mut buffer).is_none());
        assert_eq!(buffer, b"data: tail");
    }

    #[test]
    fn comments_and_other_fields_are_skipped() {
        assert_eq!(sse_data(": keep-alive"), None);
        assert_eq!(
            sse_data("event: token\ndata: one\ndata: two").as_deref(),
            Some("one\ntwo")
        );
    }
}
