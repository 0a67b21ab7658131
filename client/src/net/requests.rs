//! Outbound request builders, one per client→session event.

#[cfg(test)]
#[path = "requests_test.rs"]
mod requests_test;

use std::time::{SystemTime, UNIX_EPOCH};

use frames::events;
use frames::{Element, Stroke};
use serde_json::{Value, json};

use crate::net::{Frame, FrameStatus};

/// Build a request frame with standard client metadata.
pub fn request_frame(syscall: &str, channel_id: &str, data: Value) -> Frame {
    Frame {
        id: uuid::Uuid::new_v4().to_string(),
        parent_id: None,
        ts: now_ms(),
        channel_id: Some(channel_id.to_owned()),
        from: None,
        syscall: syscall.to_owned(),
        status: FrameStatus::Request,
        data,
    }
}

/// Wall-clock milliseconds since the epoch; 0 if the clock is before it.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

pub fn join(channel_id: &str, user_id: &str, display_name: &str) -> Frame {
    request_frame(
        events::JOIN,
        channel_id,
        json!({ events::KEY_USER_ID: user_id, events::KEY_DISPLAY_NAME: display_name }),
    )
}

pub fn leave(channel_id: &str) -> Frame {
    request_frame(events::LEAVE, channel_id, json!({}))
}

pub fn element_add(channel_id: &str, element: &Element) -> Frame {
    request_frame(events::ELEMENT_ADD, channel_id, json!({ events::KEY_ELEMENT: element }))
}

/// Full replacement record; the session keeps no per-field history.
pub fn element_update(channel_id: &str, element: &Element) -> Frame {
    request_frame(events::ELEMENT_UPDATE, channel_id, json!({ events::KEY_ELEMENT: element }))
}

pub fn element_delete(channel_id: &str, element_id: &str) -> Frame {
    request_frame(events::ELEMENT_DELETE, channel_id, json!({ events::KEY_ELEMENT_ID: element_id }))
}

pub fn stroke_add(channel_id: &str, stroke: &Stroke) -> Frame {
    request_frame(events::STROKE_ADD, channel_id, json!({ events::KEY_STROKE: stroke }))
}

pub fn clear(channel_id: &str) -> Frame {
    request_frame(events::CLEAR, channel_id, json!({}))
}

pub fn permission_set(channel_id: &str, target_user_id: &str, can_draw: bool) -> Frame {
    request_frame(
        events::PERMISSION_SET,
        channel_id,
        json!({ events::KEY_TARGET_USER_ID: target_user_id, events::KEY_CAN_DRAW: can_draw }),
    )
}

pub fn cursor(channel_id: &str, x: f64, y: f64) -> Frame {
    request_frame(events::CURSOR, channel_id, json!({ events::KEY_X: x, events::KEY_Y: y }))
}
