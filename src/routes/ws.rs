//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by event name
//! - Relayed frames from the joined session → forward to client
//!
//! Handler functions validate input, call into the session registry, and
//! return an `Outcome`. Broadcasts to peers happen inside the session (under
//! its lock); the dispatch layer only decides what goes back to the sender.
//!
//! ORDERING
//! ========
//! A mutation's `done` reply is sent after every relayed frame committed
//! before it, so the client sees acknowledgements in commit order. Cursor
//! samples arriving faster than the server gate allows are coalesced: the
//! latest one is held and relayed once the interval has passed.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. `join` → fresh relay queue, snapshot in the `done` reply
//! 3. Mutations → session applies + broadcasts, sender gets `applied`
//! 4. Relay queue closed under us → evicted, `E_RELAY_LAGGED`, implicit leave
//! 5. Close → implicit leave

use std::time::Instant;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::consts::MAX_FRAME_BYTES;
use frames::events;
use frames::{Element, SessionSnapshot, Stroke};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, FRAME_CODE, FRAME_MESSAGE, Frame, Status, error_data};
use crate::rate_limit::RateLimitError;
use crate::services::session::{Rejection, Session};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Result returned by handler functions. Handlers never write to the socket.
#[derive(Debug)]
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Acknowledge a mutation; `applied` is false when the session declined
    /// it. `earlier` holds relayed frames committed before it.
    Applied { applied: bool, earlier: Vec<Frame> },
    /// Nothing goes back to the sender.
    Silent,
}

/// Failures in the frame protocol itself, as opposed to session rejections.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("missing or invalid field: {0}")]
    MissingField(&'static str),
    #[error("join a channel before sending {0}")]
    NotJoined(String),
    #[error("connection fell behind and was removed from the session; rejoin")]
    Lagged,
}

impl ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFrame(_) => "E_INVALID_FRAME",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::NotJoined(_) => "E_NOT_JOINED",
            Self::Lagged => "E_RELAY_LAGGED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Lagged)
    }
}

/// Encoding used for frames sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Binary,
    Text,
}

/// Channel membership held by one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Joined {
    channel_id: String,
    user_id: String,
}

/// Per-connection state threaded through the handlers.
struct Conn {
    client_id: Uuid,
    joined: Option<Joined>,
    /// Relay queue of the current join. `None` while not joined.
    relay_rx: Option<mpsc::Receiver<Frame>>,
    /// Latest over-rate cursor sample, relayed once `due`.
    held_cursor: Option<HeldCursor>,
    wire: Wire,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeldCursor {
    x: f64,
    y: f64,
    due: Instant,
}

impl Conn {
    fn new(client_id: Uuid) -> Self {
        Self { client_id, joined: None, relay_rx: None, held_cursor: None, wire: Wire::Binary }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let mut conn = Conn::new(Uuid::new_v4());
    let client_id = conn.client_id;

    let welcome = Frame::request(events::SESSION_CONNECTED, Data::new())
        .with_data(events::KEY_CLIENT_ID, client_id.to_string());
    if send_frame(&mut socket, conn.wire, &welcome).await.is_err() {
        return;
    }
    info!(%client_id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break 'conn };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_bytes(&state, &mut conn, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, &mut conn, text.as_str()).await,
                    Message::Close(_) => break 'conn,
                    _ => continue,
                };
                for frame in replies {
                    if send_frame(&mut socket, conn.wire, &frame).await.is_err() {
                        break 'conn;
                    }
                }
            }
            relayed = recv_relay(&mut conn.relay_rx) => {
                let frame = match relayed {
                    Some(frame) => frame,
                    None => evicted(&state, &mut conn).await,
                };
                if send_frame(&mut socket, conn.wire, &frame).await.is_err() {
                    break 'conn;
                }
            }
            () = cursor_due(conn.held_cursor.map(|held| held.due)) => {
                relay_held_cursor(&state, &mut conn).await;
            }
        }
    }

    if let Some(joined) = conn.joined.take() {
        state
            .registry
            .leave(&joined.channel_id, client_id)
            .await;
    }
    state.cursor_limiter.forget(client_id);
    info!(%client_id, "ws: client disconnected");
}

/// Next relayed frame, or pending forever while not joined.
async fn recv_relay(rx: &mut Option<mpsc::Receiver<Frame>>) -> Option<Frame> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Fires when the held cursor sample is due, or never if none is held.
async fn cursor_due(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due.into()).await,
        None => std::future::pending().await,
    }
}

/// The session closed our relay queue: settle the implicit leave and build
/// the error frame telling the client to rejoin.
async fn evicted(state: &AppState, conn: &mut Conn) -> Frame {
    conn.relay_rx = None;
    conn.held_cursor = None;
    let mut frame = gateway_error(&ProtocolError::Lagged);
    if let Some(joined) = conn.joined.take() {
        warn!(client_id = %conn.client_id, channel_id = %joined.channel_id, "ws: relay queue closed, leaving session");
        state
            .registry
            .leave(&joined.channel_id, conn.client_id)
            .await;
        frame = frame.with_channel_id(joined.channel_id);
    }
    frame
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one binary (protobuf) message and return frames for the sender.
async fn process_inbound_bytes(state: &AppState, conn: &mut Conn, bytes: &[u8]) -> Vec<Frame> {
    conn.wire = Wire::Binary;
    let decoded = frames::decode_frame(bytes).map_err(|e| e.to_string());
    process_decoded(state, conn, decoded).await
}

/// Decode one text (JSON) message and return frames for the sender.
async fn process_inbound_text(state: &AppState, conn: &mut Conn, text: &str) -> Vec<Frame> {
    conn.wire = Wire::Text;
    let decoded = if text.len() > MAX_FRAME_BYTES {
        Err(format!("frame of {} bytes exceeds the size limit", text.len()))
    } else {
        serde_json::from_str::<frames::Frame>(text).map_err(|e| e.to_string())
    };
    process_decoded(state, conn, decoded).await
}

async fn process_decoded(state: &AppState, conn: &mut Conn, decoded: Result<frames::Frame, String>) -> Vec<Frame> {
    let req = decoded.and_then(|wire| Frame::try_from(wire).map_err(|e| e.to_string()));
    match req {
        Ok(req) => process_frame(state, conn, req).await,
        Err(message) => {
            warn!(client_id = %conn.client_id, error = %message, "ws: invalid inbound frame");
            vec![gateway_error(&ProtocolError::InvalidFrame(message))]
        }
    }
}

/// Dispatch a decoded request and apply its outcome.
async fn process_frame(state: &AppState, conn: &mut Conn, req: Frame) -> Vec<Frame> {
    if req.syscall != events::CURSOR {
        info!(client_id = %conn.client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match req.syscall.as_str() {
        events::JOIN => handle_join(state, conn, &req).await,
        events::LEAVE => Ok(handle_leave(state, conn).await),
        events::CURSOR => Ok(handle_cursor(state, conn, &req).await),
        events::ELEMENT_ADD
        | events::ELEMENT_UPDATE
        | events::ELEMENT_DELETE
        | events::STROKE_ADD
        | events::CLEAR
        | events::PERMISSION_SET => handle_mutation(state, conn, &req).await,
        other => Err(req.error_from(&ProtocolError::UnknownEvent(other.to_owned()))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Applied { applied, mut earlier }) => {
            earlier.push(req.done().with_data(events::KEY_APPLIED, applied));
            earlier
        }
        Ok(Outcome::Silent) => vec![],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// MEMBERSHIP HANDLERS
// =============================================================================

async fn handle_join(state: &AppState, conn: &mut Conn, req: &Frame) -> Result<Outcome, Frame> {
    let Some(channel_id) = req.channel_id.clone() else {
        return Err(req.error_from(&ProtocolError::MissingField("channel_id")));
    };
    let Some(user_id) = req.data_str(events::KEY_USER_ID).map(str::to_owned) else {
        return Err(req.error_from(&ProtocolError::MissingField(events::KEY_USER_ID)));
    };
    let display_name = req
        .data_str(events::KEY_DISPLAY_NAME)
        .unwrap_or(user_id.as_str())
        .to_owned();

    let next = Joined { channel_id, user_id };
    if let Some(prev) = conn.joined.take()
        && prev != next
    {
        state
            .registry
            .leave(&prev.channel_id, conn.client_id)
            .await;
    }

    conn.held_cursor = None;
    let (tx, rx) = mpsc::channel(state.config.client_queue_capacity);
    let snapshot = state
        .registry
        .join(&next.channel_id, conn.client_id, &next.user_id, &display_name, tx)
        .await;
    conn.relay_rx = Some(rx);
    conn.joined = Some(next);

    Ok(Outcome::Reply(snapshot_data(&snapshot)))
}

async fn handle_leave(state: &AppState, conn: &mut Conn) -> Outcome {
    conn.relay_rx = None;
    conn.held_cursor = None;
    if let Some(joined) = conn.joined.take() {
        state
            .registry
            .leave(&joined.channel_id, conn.client_id)
            .await;
    }
    Outcome::Applied { applied: true, earlier: Vec::new() }
}

// =============================================================================
// MUTATION HANDLERS
// =============================================================================

async fn handle_mutation(state: &AppState, conn: &mut Conn, req: &Frame) -> Result<Outcome, Frame> {
    let channel_id = joined_channel(conn, req)?.to_owned();
    let client_id = conn.client_id;

    let (result, earlier) = match req.syscall.as_str() {
        events::ELEMENT_ADD => {
            let element: Element = field(req, events::KEY_ELEMENT)?;
            commit(state, conn, &channel_id, |s| s.add_element(client_id, element)).await
        }
        events::ELEMENT_UPDATE => {
            let element: Element = field(req, events::KEY_ELEMENT)?;
            commit(state, conn, &channel_id, |s| s.update_element(client_id, element)).await
        }
        events::ELEMENT_DELETE => {
            let element_id: String = field(req, events::KEY_ELEMENT_ID)?;
            commit(state, conn, &channel_id, |s| s.delete_element(client_id, &element_id)).await
        }
        events::STROKE_ADD => {
            let stroke: Stroke = field(req, events::KEY_STROKE)?;
            commit(state, conn, &channel_id, |s| s.add_stroke(client_id, stroke)).await
        }
        events::CLEAR => commit(state, conn, &channel_id, |s| s.clear(client_id)).await,
        events::PERMISSION_SET => {
            let target: String = field(req, events::KEY_TARGET_USER_ID)?;
            let can_draw: bool = field(req, events::KEY_CAN_DRAW)?;
            commit(state, conn, &channel_id, |s| s.set_permission(client_id, &target, can_draw)).await
        }
        other => return Err(req.error_from(&ProtocolError::UnknownEvent(other.to_owned()))),
    };

    let applied = acknowledge(conn, &req.syscall, result);
    Ok(Outcome::Applied { applied, earlier })
}

/// Apply a mutation under the session lock. Frames already queued for this
/// connection at that point were committed before it; they are taken out of
/// the queue and returned so they reach the client ahead of the reply.
async fn commit(
    state: &AppState,
    conn: &mut Conn,
    channel_id: &str,
    apply: impl FnOnce(&mut Session) -> Result<(), Rejection>,
) -> (Result<(), Rejection>, Vec<Frame>) {
    let mut earlier = Vec::new();
    let relay_rx = &mut conn.relay_rx;
    let result = state
        .registry
        .with_session(channel_id, |s| {
            if let Some(rx) = relay_rx.as_mut() {
                while let Ok(frame) = rx.try_recv() {
                    earlier.push(frame);
                }
            }
            apply(s)
        })
        .await;
    (result, earlier)
}

/// Relay a pointer position. Never replied to; over-rate samples are held
/// and the latest one is relayed when the interval has passed.
async fn handle_cursor(state: &AppState, conn: &mut Conn, req: &Frame) -> Outcome {
    if conn.joined.is_none() {
        return Outcome::Silent;
    }
    let (Some(x), Some(y)) = (
        req.data.get(events::KEY_X).and_then(Value::as_f64),
        req.data.get(events::KEY_Y).and_then(Value::as_f64),
    ) else {
        return Outcome::Silent;
    };

    relay_cursor(state, conn, x, y).await;
    Outcome::Silent
}

/// Relay the held sample if its interval has passed.
async fn relay_held_cursor(state: &AppState, conn: &mut Conn) {
    if let Some(HeldCursor { x, y, .. }) = conn.held_cursor.take() {
        relay_cursor(state, conn, x, y).await;
    }
}

async fn relay_cursor(state: &AppState, conn: &mut Conn, x: f64, y: f64) {
    let Some(Joined { channel_id, .. }) = &conn.joined else {
        return;
    };
    if let Err(RateLimitError::CursorTooFrequent { retry_in }) = state.cursor_limiter.check_and_record(conn.client_id) {
        conn.held_cursor = Some(HeldCursor { x, y, due: Instant::now() + retry_in });
        return;
    }

    conn.held_cursor = None;
    let client_id = conn.client_id;
    let result = state
        .registry
        .with_session(channel_id, |s| s.set_cursor(client_id, x, y))
        .await;
    acknowledge(conn, events::CURSOR, result);
}

// =============================================================================
// HELPERS
// =============================================================================

/// Channel of the current join, checked against the request's channel.
fn joined_channel<'a>(conn: &'a Conn, req: &Frame) -> Result<&'a str, Frame> {
    match &conn.joined {
        Some(joined) if req.channel_id.as_deref().is_none_or(|c| c == joined.channel_id) => {
            Ok(joined.channel_id.as_str())
        }
        _ => Err(req.error_from(&ProtocolError::NotJoined(req.syscall.clone()))),
    }
}

/// Collapse a session result into the `applied` flag, logging rejections.
fn acknowledge(conn: &Conn, syscall: &str, result: Result<(), Rejection>) -> bool {
    match result {
        Ok(()) => true,
        Err(rejection) => {
            debug!(
                client_id = %conn.client_id,
                %syscall,
                code = rejection.error_code(),
                reason = %rejection,
                "ws: mutation rejected"
            );
            false
        }
    }
}

/// Error frame not tied to any request.
fn gateway_error(err: &ProtocolError) -> Frame {
    let mut frame = Frame::request(events::GATEWAY_ERROR, error_data(err));
    frame.status = Status::Error;
    frame
}

/// Typed payload field.
fn field<T: DeserializeOwned>(req: &Frame, key: &'static str) -> Result<T, Frame> {
    req.data
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| req.error_from(&ProtocolError::MissingField(key)))
}

fn snapshot_data(snapshot: &SessionSnapshot) -> Data {
    match serde_json::to_value(snapshot) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

async fn send_frame(socket: &mut WebSocket, wire: Wire, frame: &Frame) -> Result<(), ()> {
    let wire_frame = frames::Frame::from(frame);
    let msg = match wire {
        Wire::Binary => Message::Binary(frames::encode_frame(&wire_frame).into()),
        Wire::Text => match serde_json::to_string(&wire_frame) {
            Ok(json) => Message::Text(json.into()),
            Err(e) => {
                warn!(error = %e, "ws: failed to serialize frame");
                return Err(());
            }
        },
    };

    if frame.status == Status::Error {
        let code = frame
            .data
            .get(FRAME_CODE)
            .and_then(Value::as_str)
            .unwrap_or("-");
        let message = frame
            .data
            .get(FRAME_MESSAGE)
            .and_then(Value::as_str)
            .unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if frame.syscall != events::CURSOR {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }

    socket.send(msg).await.map_err(|e| {
        warn!(error = %e, "ws: send failed");
    })
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
