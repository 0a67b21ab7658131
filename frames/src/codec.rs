//! Protobuf codec for [`Frame`].
//!
//! The payload travels as a `google.protobuf.Value` tree. Protobuf has a
//! single numeric type, so every JSON number comes back as `f64`, and a
//! non-finite number comes back as `null`.

use prost::Message;
use prost_types::value::Kind;
use prost_types::{ListValue, NullValue, Struct};
use serde_json::{Map, Number, Value};

use crate::consts::MAX_FRAME_BYTES;
use crate::{Frame, Status};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid frame status: {0}")]
    InvalidStatus(i32),
    #[error("frame of {0} bytes exceeds the size limit")]
    TooLarge(usize),
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    frame_to_wire(frame).encode_to_vec()
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// `TooLarge` above [`MAX_FRAME_BYTES`], `Decode` for malformed bytes,
/// `InvalidStatus` for an unknown status value.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(CodecError::TooLarge(bytes.len()));
    }
    wire_to_frame(WireFrame::decode(bytes)?)
}

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, optional, tag = "4")]
    channel_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    from: Option<String>,
    #[prost(string, tag = "6")]
    syscall: String,
    #[prost(enumeration = "WireStatus", tag = "7")]
    status: i32,
    #[prost(message, optional, tag = "8")]
    data: Option<prost_types::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireStatus {
    Request = 0,
    Done = 1,
    Error = 2,
    Cancel = 3,
    Item = 4,
    Bulk = 5,
}

impl From<Status> for WireStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Request => Self::Request,
            Status::Item => Self::Item,
            Status::Bulk => Self::Bulk,
            Status::Done => Self::Done,
            Status::Error => Self::Error,
            Status::Cancel => Self::Cancel,
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = CodecError;

    fn try_from(raw: i32) -> Result<Self, CodecError> {
        let wire = WireStatus::try_from(raw).map_err(|_| CodecError::InvalidStatus(raw))?;
        Ok(match wire {
            WireStatus::Request => Status::Request,
            WireStatus::Item => Status::Item,
            WireStatus::Bulk => Status::Bulk,
            WireStatus::Done => Status::Done,
            WireStatus::Error => Status::Error,
            WireStatus::Cancel => Status::Cancel,
        })
    }
}

// `WireFrame::from` is the generated accessor for the `from` field, so the
// conversions are plain functions rather than `From` impls.
fn frame_to_wire(frame: &Frame) -> WireFrame {
    WireFrame {
        id: frame.id.clone(),
        parent_id: frame.parent_id.clone(),
        ts: frame.ts,
        channel_id: frame.channel_id.clone(),
        from: frame.from.clone(),
        syscall: frame.syscall.clone(),
        status: WireStatus::from(frame.status).into(),
        data: Some(encode_value(&frame.data)),
    }
}

fn wire_to_frame(wire: WireFrame) -> Result<Frame, CodecError> {
    let status = Status::try_from(wire.status)?;
    // Absent data decodes as an empty object, never `null`.
    let data = wire
        .data
        .map_or_else(|| Value::Object(Map::new()), decode_value);
    Ok(Frame {
        id: wire.id,
        parent_id: wire.parent_id,
        ts: wire.ts,
        channel_id: wire.channel_id,
        from: wire.from,
        syscall: wire.syscall,
        status,
        data,
    })
}

// =============================================================================
// PAYLOAD
// =============================================================================

fn encode_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(NullValue::NullValue.into()),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(ListValue { values: items.iter().map(encode_value).collect() }),
        Value::Object(fields) => Kind::StructValue(Struct {
            fields: fields
                .iter()
                .map(|(key, v)| (key.clone(), encode_value(v)))
                .collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

fn decode_value(value: prost_types::Value) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::NumberValue(n)) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(decode_value).collect()),
        Some(Kind::StructValue(object)) => Value::Object(
            object
                .fields
                .into_iter()
                .map(|(key, v)| (key, decode_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
