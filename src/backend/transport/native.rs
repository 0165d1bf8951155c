use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStderr, ChildStdout, Command};
use tokio::sync::{broadcast, oneshot};

use crate::backend::error::{ApiError, ApiResult};

use super::{NativeBridge, NativeEvent};

/// sidecar 結束時廣播的事件名稱。
pub const TERMINATED_EVENT: &str = "backend-terminated";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<ApiResult<Value>>>>>;

/// `NativeBridge` 的 sidecar 實作：與打包在桌面執行環境中的後端程序以逐行 JSON 溝通。
///
/// 送出：`{"id": 1, "cmd": "list_providers", "args": {...}}`
/// 回覆：`{"id": 1, "result": ...}` 或 `{"id": 1, "error": "..."}`
/// 事件：`{"event": "assistant-token", "payload": {...}}`
pub struct SidecarBridge {
    /// 持有子程序；`kill_on_drop` 確保橋接被丟棄時程序一併結束。
    _child: Mutex<Child>,
    /// 子程序 stdin 的寫入端，多個呼叫可能同時寫入，因此以非同步鎖保護。
    stdin: tokio::sync::Mutex<ChildStdin>,
    /// 尚未收到回覆的呼叫。
    pending: PendingMap,
    next_id: AtomicU64,
    events: broadcast::Sender<NativeEvent>,
    label: String,
}

#[derive(Serialize)]
struct IpcRequest<'a> {
    id: u64,
    cmd: &'a str,
    args: &'a Value,
}

#[derive(Deserialize)]
struct IpcReply {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IpcIncoming {
    Reply(IpcReply),
    Event(NativeEvent),
}

impl SidecarBridge {
    /// 啟動 sidecar 程序並建立 stdout/stderr 監聽任務。
    ///
    /// 必須在 tokio 執行環境內呼叫。
    pub fn start(program: &Path, args: &[String], env: &BTreeMap<String, String>) -> Result<Self> {
        let label = program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("native")
            .to_string();

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(anyhow!("native backend not found: {}", program.display()));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to start native backend {label}"));
            }
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("native backend stdin pipe missing"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("native backend stdout pipe missing"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("native backend stderr pipe missing"))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(256);

        spawn_stdout_listener(stdout, pending.clone(), events.clone());
        spawn_stderr_listener(stderr, label.clone());

        debug!("native backend {} started", label);
        Ok(Self {
            _child: Mutex::new(child),
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            events,
            label,
        })
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }
}

/// 逐行讀取 stdout：回覆交給等待中的呼叫，事件則廣播給訂閱者。
fn spawn_stdout_listener(
    stdout: ChildStdout,
    pending: PendingMap,
    events: broadcast::Sender<NativeEvent>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(raw)) => {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<IpcIncoming>(&raw) {
                        Ok(IpcIncoming::Reply(reply)) => {
                            let waiter = pending.lock().ok().and_then(|mut map| map.remove(&reply.id));
                            let outcome = match reply.error {
                                Some(message) => Err(ApiError::Native(message)),
                                None => Ok(reply.result),
                            };
                            match waiter {
                                Some(tx) => {
                                    let _ = tx.send(outcome);
                                }
                                None => debug!("dropping reply for unknown call {}", reply.id),
                            }
                        }
                        Ok(IpcIncoming::Event(event)) => {
                            // 沒有訂閱者時 send 會失敗，這是正常情況。
                            let _ = events.send(event);
                        }
                        Err(_) => warn!("unparseable native backend line: {}", raw),
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("failed to read native backend stdout: {err}");
                    break;
                }
            }
        }

        if let Ok(mut map) = pending.lock() {
            for (_, tx) in map.drain() {
                let _ = tx.send(Err(ApiError::Native(String::from("native backend exited"))));
            }
        }
        let _ = events.send(NativeEvent {
            event: TERMINATED_EVENT.to_string(),
            payload: Value::Null,
        });
    });
}

/// stderr 的每一行都寫進日誌。
fn spawn_stderr_listener(stderr: ChildStderr, label: String) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!("[{}] {}", label, line);
        }
    });
}

#[async_trait]
impl NativeBridge for SidecarBridge {
    fn name(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, command: &str, args: Value) -> ApiResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ApiError::Native(String::from("native call table poisoned")))?
            .insert(id, tx);

        let mut line = serde_json::to_string(&IpcRequest {
            id,
            cmd: command,
            args: &args,
        })?;
        line.push('\n');

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = written {
            self.forget(id);
            return Err(ApiError::Native(format!(
                "failed to send `{command}` to native backend: {err}"
            )));
        }

        rx.await
            .unwrap_or_else(|_| Err(ApiError::Native(String::from("native backend exited"))))
    }

    fn subscribe(&self) -> broadcast::Receiver<NativeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_lines_split_into_replies_and_events() {
        let reply: IpcIncoming = serde_json::from_str(r#"{"id":7,"result":{"ok":true}}"#).unwrap();
        assert!(matches!(reply, IpcIncoming::Reply(IpcReply { id: 7, .. })));

        let failed: IpcIncoming = serde_json::from_str(r#"{"id":8,"error":"boom"}"#).unwrap();
        match failed {
            IpcIncoming::Reply(reply) => assert_eq!(reply.error.as_deref(), Some("boom")),
            IpcIncoming::Event(_) => panic!("expected reply"),
        }

        let event: IpcIncoming =
            serde_json::from_str(r#"{"event":"assistant-token","payload":{"chunk":"hi"}}"#).unwrap();
        match event {
            IpcIncoming::Event(event) => {
                assert_eq!(event.event, "assistant-token");
                assert_eq!(event.payload["chunk"], "hi");
            }
            IpcIncoming::Reply(_) => panic!("expected event"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invokes_commands_over_stdio() {
        // 用 shell 腳本模擬 sidecar：對每一行請求回覆相同 id。
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("sidecar.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile read line; do\n  id=$(echo \"$line\" | sed 's/.*\"id\":\\([0-9]*\\).*/\\1/')\n  echo \"{\\\"id\\\":$id,\\\"result\\\":{\\\"pong\\\":true}}\"\ndone\n",
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let bridge = SidecarBridge::start(&script, &[], &BTreeMap::new()).unwrap();
        let value = bridge.invoke("health", serde_json::json!({})).await.unwrap();
        assert_eq!(value["pong"], true);
        let value = bridge.invoke("health", serde_json::json!({})).await.unwrap();
        assert_eq!(value["pong"], true);
    }
}
