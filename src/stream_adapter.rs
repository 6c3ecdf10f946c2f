//! Stream adapter: translates the external JSON/WebSocket protocol into
//! session operations.

use crate::error::SessionError;
use crate::registry::SessionRegistry;
use crate::session_id::SessionId;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

#[derive(Debug)]
enum ClientMessage {
    Audio { data: String },
    Stop,
    Unknown,
}

/// Parse the client's JSON envelope, distinguishing malformed JSON from a
/// well-formed message whose `type` isn't one the server recognizes —
/// these surface as different error codes to the client.
fn parse_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let msg_type = value.get("type").and_then(|t| t.as_str()).unwrap_or("");

    Ok(match msg_type {
        "audio" => ClientMessage::Audio {
            data: value
                .get("data")
                .and_then(|d| d.as_str())
                .unwrap_or("")
                .to_string(),
        },
        "stop" => ClientMessage::Stop,
        _ => ClientMessage::Unknown,
    })
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    #[serde(rename = "session_start")]
    SessionStart { session_id: SessionId },
    #[serde(rename = "partial")]
    Partial { text: String },
    #[serde(rename = "final")]
    Final,
    #[serde(rename = "error")]
    Error { message: String, code: ErrorCode },
}

#[derive(Debug, Clone, Copy, Serialize)]
enum ErrorCode {
    #[serde(rename = "SESSION_LIMIT")]
    SessionLimit,
    #[serde(rename = "SESSION_CLOSING")]
    SessionClosing,
    #[serde(rename = "INVALID_JSON")]
    InvalidJson,
    #[serde(rename = "INVALID_AUDIO")]
    InvalidAudio,
    #[serde(rename = "UNKNOWN_TYPE")]
    UnknownType,
    /// Not part of the original five protocol codes: the ASR backend
    /// raised on a chunk. Recoverable — the session stays open.
    #[serde(rename = "ASR_ERROR")]
    AsrError,
}

async fn send(sink: &mut (impl futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin), msg: &ServerMessage) -> bool {
    let Ok(json) = serde_json::to_string(msg) else {
        return false;
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}

/// Drive one client connection end to end: admission, the audio/stop
/// message loop, and cleanup on every exit path.
pub async fn handle_connection<S>(ws_stream: WebSocketStream<S>, registry: Arc<SessionRegistry>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sender, mut receiver) = ws_stream.split();

    let session = match registry.create().await {
        Ok(session) => session,
        Err(_) => {
            let _ = send(
                &mut sender,
                &ServerMessage::Error {
                    message: "maximum concurrent sessions reached".into(),
                    code: ErrorCode::SessionLimit,
                },
            )
            .await;
            let _ = sender
                .send(Message::Close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                    code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Policy,
                    reason: "session limit exceeded".into(),
                })))
                .await;
            return;
        }
    };

    let session_id = session.id();
    info!(session_id = %session_id.short(), "stream session started");

    if !send(
        &mut sender,
        &ServerMessage::SessionStart { session_id },
    )
    .await
    {
        registry.close(session_id).await;
        return;
    }

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        match parse_client_message(&text) {
            Ok(ClientMessage::Stop) => break,
            Ok(ClientMessage::Unknown) => {
                if !send(
                    &mut sender,
                    &ServerMessage::Error {
                        message: "unrecognized message type".into(),
                        code: ErrorCode::UnknownType,
                    },
                )
                .await
                {
                    break;
                }
            }
            Ok(ClientMessage::Audio { data }) => {
                let Ok(pcm) = BASE64.decode(data.as_bytes()) else {
                    if !send(
                        &mut sender,
                        &ServerMessage::Error {
                            message: "audio data is not valid base64".into(),
                            code: ErrorCode::InvalidAudio,
                        },
                    )
                    .await
                    {
                        break;
                    }
                    continue;
                };

                if pcm.is_empty() {
                    continue;
                }

                match session.process_chunk(&pcm).await {
                    Ok(result) => {
                        let server_msg = if result.is_final {
                            ServerMessage::Final
                        } else {
                            ServerMessage::Partial { text: result.text }
                        };
                        if !send(&mut sender, &server_msg).await {
                            break;
                        }
                    }
                    Err(SessionError::SessionClosing) => {
                        let _ = send(
                            &mut sender,
                            &ServerMessage::Error {
                                message: "session is closing".into(),
                                code: ErrorCode::SessionClosing,
                            },
                        )
                        .await;
                        break;
                    }
                    Err(err) => {
                        warn!(session_id = %session_id.short(), error = %err, "transcription error");
                        let _ = send(
                            &mut sender,
                            &ServerMessage::Error {
                                message: err.to_string(),
                                code: ErrorCode::AsrError,
                            },
                        )
                        .await;
                    }
                }
            }
            Err(_) => {
                if !send(
                    &mut sender,
                    &ServerMessage::Error {
                        message: "malformed JSON message".into(),
                        code: ErrorCode::InvalidJson,
                    },
                )
                .await
                {
                    break;
                }
            }
        }
    }

    registry.close(session_id).await;
    info!(session_id = %session_id.short(), "stream session ended");
}
