use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use nowfile_presence_engine::{ActivityState, PresenceSink};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

pub const PORTS: [u16; 10] = [6463, 6464, 6465, 6466, 6467, 6468, 6469, 6470, 6471, 6472];
pub const IPC_SLOTS: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

const OPCODE_HANDSHAKE: i32 = 0;
const OPCODE_FRAME: i32 = 1;
const OPCODE_CLOSE: i32 = 2;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Transport {
    Ipc(IpcTransport),
    Ws(Ws),
}

#[cfg(unix)]
enum IpcTransport {
    Unix(tokio::net::UnixStream),
}

#[cfg(windows)]
enum IpcTransport {
    Pipe(tokio::net::windows::named_pipe::NamedPipeClient),
}

pub struct DiscordRpcClient {
    client_id: String,
    transport: Option<Transport>,
    call_timeout: Duration,
}

impl DiscordRpcClient {
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            transport: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn send_or_drop(&mut self, payload: Value) -> Result<()> {
        let call_timeout = self.call_timeout;
        let res = match tokio::time::timeout(call_timeout, self.send_payload(payload)).await {
            Ok(res) => res,
            Err(_) => Err(anyhow!(
                "discord rpc call timed out after {:?}",
                call_timeout
            )),
        };
        if res.is_err() {
            self.transport = None;
        }
        res
    }

    async fn send_payload(&mut self, payload: Value) -> Result<()> {
        match self.transport.as_mut() {
            Some(Transport::Ipc(ipc)) => {
                send_ipc_frame(ipc, OPCODE_FRAME, payload.to_string().as_bytes()).await?;
                let (_, raw) = recv_ipc_frame(ipc).await?;
                validate_rpc_response(&raw)
            }
            Some(Transport::Ws(ws)) => {
                ws.send(Message::Text(payload.to_string()))
                    .await
                    .context("failed sending discord ws message")?;
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => validate_rpc_response(text.as_bytes()),
                    Some(Ok(Message::Binary(bin))) => validate_rpc_response(&bin),
                    Some(Ok(_)) => Ok(()),
                    Some(Err(err)) => Err(anyhow!("discord ws receive failed: {err}")),
                    None => Err(anyhow!("discord ws closed")),
                }
            }
            None => Err(anyhow!("discord transport not connected")),
        }
    }
}

#[async_trait]
impl PresenceSink for DiscordRpcClient {
    async fn connect(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }

        if let Some(ipc) = try_connect_ipc(&self.client_id).await {
            self.transport = Some(Transport::Ipc(ipc));
            return Ok(());
        }

        if let Some(ws) = try_connect_ws(&self.client_id).await {
            self.transport = Some(Transport::Ws(ws));
            return Ok(());
        }

        Err(anyhow!("unable to connect to local Discord RPC"))
    }

    async fn set_activity(&mut self, activity: &ActivityState) -> Result<()> {
        let payload = set_activity_command(Some(activity_json(activity)));
        self.send_or_drop(payload).await
    }

    async fn clear_activity(&mut self) -> Result<()> {
        let payload = set_activity_command(None);
        self.send_or_drop(payload).await
    }

    async fn disconnect(&mut self) {
        match self.transport.take() {
            Some(Transport::Ipc(mut ipc)) => {
                let _ = send_ipc_frame(&mut ipc, OPCODE_CLOSE, b"{}").await;
            }
            Some(Transport::Ws(mut ws)) => {
                let _ = ws.close(None).await;
            }
            None => {}
        }
    }
}

fn set_activity_command(activity: Option<Value>) -> Value {
    json!({
        "cmd": "SET_ACTIVITY",
        "args": {
            "pid": std::process::id(),
            "activity": activity.unwrap_or(Value::Null)
        },
        "nonce": nonce()
    })
}

pub fn activity_json(state: &ActivityState) -> Value {
    let mut activity = json!({
        "details": state.details,
        "state": state.state_text,
        "timestamps": { "start": state.start_ms, "end": state.end_ms },
        "instance": true
    });

    if let Some(obj) = activity.as_object_mut() {
        if let Some(assets) = build_assets(state) {
            obj.insert("assets".to_string(), assets);
        }
        if !state.links.is_empty() {
            let buttons = state
                .links
                .iter()
                .map(|l| json!({"label": l.label, "url": l.url}))
                .collect::<Vec<_>>();
            obj.insert("buttons".to_string(), Value::Array(buttons));
        }
    }

    activity
}

async fn try_connect_ws(client_id: &str) -> Option<Ws> {
    for port in PORTS {
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/?v=1&client_id={client_id}")).ok()?;
        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                let handshake = json!({ "v": 1, "client_id": client_id });
                if ws.send(Message::Text(handshake.to_string())).await.is_err() {
                    continue;
                }
                if ws.next().await.is_some() {
                    debug!("connected to discord rpc websocket on port {}", port);
                    return Some(ws);
                }
            }
            Err(err) => {
                debug!("discord ws connect failed on port {}: {}", port, err);
            }
        }
    }
    None
}

async fn try_connect_ipc(client_id: &str) -> Option<IpcTransport> {
    for slot in IPC_SLOTS {
        match connect_ipc_slot(slot).await {
            Ok(mut ipc) => {
                let hs = json!({"v": 1, "client_id": client_id}).to_string();
                if send_ipc_frame(&mut ipc, OPCODE_HANDSHAKE, hs.as_bytes())
                    .await
                    .is_err()
                {
                    continue;
                }
                match recv_ipc_frame(&mut ipc).await {
                    Ok((OPCODE_CLOSE, raw)) => {
                        warn!(
                            "discord closed ipc slot {} during handshake: {}",
                            slot,
                            String::from_utf8_lossy(&raw)
                        );
                    }
                    Ok(_) => {
                        debug!("connected to discord ipc slot {}", slot);
                        return Some(ipc);
                    }
                    Err(err) => {
                        debug!("discord ipc slot {} handshake failed: {}", slot, err);
                    }
                }
            }
            Err(err) => {
                debug!("discord ipc slot {} unavailable: {}", slot, err);
            }
        }
    }
    None
}

#[cfg(unix)]
pub fn ipc_socket_candidates(slot: u8) -> Vec<std::path::PathBuf> {
    use std::path::PathBuf;

    let name = format!("discord-ipc-{slot}");
    let mut paths = Vec::new();
    for var in ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"] {
        if let Ok(dir) = std::env::var(var) {
            paths.push(PathBuf::from(dir).join(&name));
        }
    }
    paths.push(PathBuf::from("/tmp").join(&name));
    paths.push(PathBuf::from("/private/tmp").join(&name));
    paths
}

#[cfg(unix)]
async fn connect_ipc_slot(slot: u8) -> Result<IpcTransport> {
    for p in ipc_socket_candidates(slot) {
        if let Ok(stream) = tokio::net::UnixStream::connect(&p).await {
            return Ok(IpcTransport::Unix(stream));
        }
    }

    Err(anyhow!("no unix discord ipc socket found"))
}

#[cfg(windows)]
async fn connect_ipc_slot(slot: u8) -> Result<IpcTransport> {
    use tokio::net::windows::named_pipe::ClientOptions;
    let path = format!(r"\\?\pipe\discord-ipc-{}", slot);
    let pipe = ClientOptions::new().open(&path)?;
    Ok(IpcTransport::Pipe(pipe))
}

fn encode_frame(opcode: i32, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.extend_from_slice(&opcode.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn decode_header(hdr: [u8; 8]) -> Result<(i32, usize)> {
    let opcode = i32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
    let len = i32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    let len = usize::try_from(len).map_err(|_| anyhow!("invalid discord ipc frame length"))?;
    Ok((opcode, len))
}

async fn send_ipc_frame(ipc: &mut IpcTransport, opcode: i32, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(opcode, payload);

    match ipc {
        #[cfg(unix)]
        IpcTransport::Unix(stream) => {
            stream.write_all(&frame).await?;
            stream.flush().await?;
        }
        #[cfg(windows)]
        IpcTransport::Pipe(pipe) => {
            pipe.write_all(&frame).await?;
            pipe.flush().await?;
        }
    }
    Ok(())
}

async fn recv_ipc_frame(ipc: &mut IpcTransport) -> Result<(i32, Vec<u8>)> {
    let mut hdr = [0u8; 8];
    match ipc {
        #[cfg(unix)]
        IpcTransport::Unix(stream) => stream.read_exact(&mut hdr).await?,
        #[cfg(windows)]
        IpcTransport::Pipe(pipe) => pipe.read_exact(&mut hdr).await?,
    };

    let (opcode, len) = decode_header(hdr)?;
    let mut payload = vec![0u8; len];
    match ipc {
        #[cfg(unix)]
        IpcTransport::Unix(stream) => stream.read_exact(&mut payload).await?,
        #[cfg(windows)]
        IpcTransport::Pipe(pipe) => pipe.read_exact(&mut payload).await?,
    };

    if !matches!(opcode, OPCODE_FRAME | OPCODE_HANDSHAKE | OPCODE_CLOSE) {
        warn!("discord ipc unexpected opcode {}", opcode);
    }

    Ok((opcode, payload))
}

fn nonce() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let n = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{n:x}")
}

fn build_assets(state: &ActivityState) -> Option<Value> {
    let mut assets = serde_json::Map::new();
    let fields = [
        ("large_image", &state.large_image_key),
        ("large_text", &state.large_image_text),
        ("small_image", &state.small_image_key),
        ("small_text", &state.small_image_text),
    ];
    for (key, value) in fields {
        if !value.is_empty() {
            assets.insert(key.to_string(), json!(value));
        }
    }
    if assets.is_empty() {
        None
    } else {
        Some(Value::Object(assets))
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    evt: Option<String>,
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    code: Option<i64>,
    message: Option<String>,
}

fn validate_rpc_response(raw: &[u8]) -> Result<()> {
    let Ok(resp) = serde_json::from_slice::<RpcResponse>(raw) else {
        return Ok(());
    };

    let is_error = resp
        .evt
        .as_deref()
        .map(|evt| evt.eq_ignore_ascii_case("ERROR"))
        .unwrap_or(false);
    if is_error {
        let data = resp.data.unwrap_or(RpcErrorData {
            code: None,
            message: None,
        });
        let code = data.code.unwrap_or_default();
        let msg = data
            .message
            .unwrap_or_else(|| "unknown discord rpc error".to_string());
        return Err(anyhow!("discord rpc error {code}: {msg}"));
    }

    Ok(())
}
