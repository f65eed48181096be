use crate::domain::{ClientId, PlayerInput, Snapshot};
use crate::frameworks::config;
use crate::interface_adapters::net::chat;
use crate::interface_adapters::protocol::{ChatDto, ClientMessage, ServerMessage, SnapshotDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::{next_client_id, next_id};
use crate::use_cases::GameEvent;

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    SnapshotsClosed,
    ChatClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a client_id exists.
        let span = info_span!("conn", conn_id = next_id(), client_id = tracing::field::Empty);
        handle_socket(socket, state).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    tracing::Span::current().record("client_id", ctx.client_id.0);
    info!(client_id = ctx.client_id.0, name = %ctx.name, "client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    client_id: ClientId,
    name: String,
    input_tx: mpsc::Sender<GameEvent>,
    chat_tx: broadcast::Sender<Utf8Bytes>,
    chat_rx: broadcast::Receiver<Utf8Bytes>,
    snapshot_rx: mpsc::Receiver<Snapshot>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,

    last_input_full_log: Instant,
    last_invalid_input_log: Instant,
    last_chat_lag_log: Instant,

    close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    name: String,
    bytes_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no chat line is missed.
    let chat_rx = state.chat_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let client_id = next_client_id();
    let (snapshot_tx, snapshot_rx) = mpsc::channel(config::SNAPSHOT_CHANNEL_CAPACITY);

    // Send Identity Packet
    send_message(
        socket,
        &ServerMessage::Identity {
            client_id: client_id.0,
        },
    )
    .await?;

    // Join happens before the welcome so the first snapshot can include the new player.
    // The caller never reaches cleanup if bootstrap fails, so a failure after Join sends Leave here.
    state
        .input_tx
        .send(GameEvent::Join {
            client_id,
            name: join.name.clone(),
            snapshot_tx,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    chat::publish(&state.chat_tx, chat::joined(&join.name));
    let welcome = ServerMessage::Chat(chat::welcome(&join.name));
    let bytes_out = match send_message(socket, &welcome).await {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            let _ = state.input_tx.send(GameEvent::Leave { client_id }).await;
            chat::publish(&state.chat_tx, chat::left(&join.name));
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        client_id,
        name: join.name,
        input_tx: state.input_tx.clone(),
        chat_tx: state.chat_tx.clone(),
        chat_rx,
        snapshot_rx,

        msgs_in: 1,
        // Identity and welcome.
        msgs_out: 2,
        bytes_in: join.bytes_in,
        bytes_out,
        invalid_json: 0,

        last_input_full_log: now,
        last_invalid_input_log: now,
        last_chat_lag_log: now,

        close_frame: None,
    })
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => Ok(JoinHandshake {
                        name: chat::display_name(&payload.name),
                        bytes_in,
                    }),
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Rejects frames the simulation cannot use. Bad build coordinates only cost the build.
fn sanitize_input(mut input: PlayerInput) -> Option<PlayerInput> {
    if !input.orientation.is_finite() {
        return None;
    }
    input.build = input
        .build
        .filter(|build| build.x.is_finite() && build.y.is_finite());
    Some(input)
}

fn process_input_message(ctx: &mut ConnCtx, input: PlayerInput) -> Result<LoopControl, NetError> {
    let client_id = ctx.client_id;
    let Some(input) = sanitize_input(input) else {
        if should_log(&mut ctx.last_invalid_input_log) {
            warn!(client_id = client_id.0, "invalid input values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match ctx.input_tx.try_send(GameEvent::Input { client_id, input }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(client_id = client_id.0, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Snapshot, already filtered for this client by the world task.
            snapshot = ctx.snapshot_rx.recv() => {
                match snapshot {
                    Some(snapshot) => {
                        let msg = ServerMessage::Snapshot(SnapshotDto::from(snapshot));
                        match forward(socket, &msg, ctx).await {
                            LoopControl::Continue => false,
                            LoopControl::Disconnect => true,
                        }
                    }
                    None => {
                        fatal = Some(NetError::SnapshotsClosed);
                        true
                    }
                }
            }

            // Outgoing Chat
            line = ctx.chat_rx.recv() => {
                match line {
                    Ok(bytes) => match forward_bytes(socket, bytes, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_chat_lag_log) {
                            warn!(missed = n, "chat lagged; skipping missed lines");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::ChatClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let client_id = ctx.client_id.0;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(client_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Input(input)) => process_input_message(ctx, input.into()),
                    Ok(ClientMessage::Chat(payload)) => {
                        if let Some(message) = chat::clean_message(&payload.message) {
                            chat::publish(
                                &ctx.chat_tx,
                                ChatDto {
                                    name: ctx.name.clone(),
                                    message,
                                    is_notification: false,
                                },
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                client_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(client_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(client_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward(socket: &mut WebSocket, msg: &ServerMessage, ctx: &mut ConnCtx) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send message");
            LoopControl::Disconnect
        }
    }
}

async fn forward_bytes(socket: &mut WebSocket, bytes: Utf8Bytes, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send chat line");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let client_id = ctx.client_id;
    // Tell everyone before the world drops the player, matching the join order.
    chat::publish(&ctx.chat_tx, chat::left(&ctx.name));

    ctx.input_tx
        .send(GameEvent::Leave { client_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        client_id = client_id.0,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!(client_id = client_id.0, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BuildRequest, ConstructKind, KeyboardState};

    fn input(orientation: f64, build: Option<BuildRequest>) -> PlayerInput {
        PlayerInput {
            keyboard: KeyboardState::default(),
            orientation,
            shoot: true,
            build,
            timestamp: None,
        }
    }

    #[test]
    fn when_orientation_is_nan_then_frame_is_dropped() {
        assert!(sanitize_input(input(f64::NAN, None)).is_none());
        assert!(sanitize_input(input(f64::INFINITY, None)).is_none());
    }

    #[test]
    fn when_build_coordinates_are_not_finite_then_only_build_is_dropped() {
        let build = BuildRequest {
            kind: ConstructKind::Wall,
            x: f64::NAN,
            y: 3.0,
        };

        let sanitized = sanitize_input(input(1.0, Some(build))).expect("frame kept");

        assert_eq!(sanitized.build, None);
        assert!(sanitized.shoot);
    }

    #[test]
    fn when_input_is_clean_then_passes_unchanged() {
        let build = BuildRequest {
            kind: ConstructKind::Turret,
            x: 10.0,
            y: 3.0,
        };
        let frame = input(1.0, Some(build));

        assert_eq!(sanitize_input(frame.clone()), Some(frame));
    }
}
