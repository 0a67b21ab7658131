use serde_json::json;

use super::*;

fn frame(status: Status, data: Value) -> Frame {
    Frame {
        id: "f-1".to_owned(),
        parent_id: Some("p-1".to_owned()),
        ts: 1_700_000_000_000,
        channel_id: Some("voice-1".to_owned()),
        from: Some("alice".to_owned()),
        syscall: "element:update".to_owned(),
        status,
        data,
    }
}

fn wire_bytes(status: i32, data: Option<prost_types::Value>) -> Vec<u8> {
    WireFrame {
        id: "f-1".to_owned(),
        parent_id: None,
        ts: 0,
        channel_id: None,
        from: None,
        syscall: "join".to_owned(),
        status,
        data,
    }
    .encode_to_vec()
}

#[test]
fn wire_status_values_are_stable() {
    let values: Vec<i32> = [Status::Request, Status::Done, Status::Error, Status::Cancel, Status::Item, Status::Bulk]
        .into_iter()
        .map(|s| WireStatus::from(s).into())
        .collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn routing_fields_survive_encoding() {
    let original = frame(Status::Done, json!({"applied": true}));
    let decoded = decode_frame(&encode_frame(&original)).expect("decode");
    assert_eq!(decoded.from.as_deref(), Some("alice"));
    assert_eq!(decoded.parent_id.as_deref(), Some("p-1"));
    assert_eq!(decoded.channel_id.as_deref(), Some("voice-1"));
    assert_eq!(decoded.status, Status::Done);
}

#[test]
fn unknown_wire_status_is_rejected() {
    assert!(matches!(Status::try_from(42), Err(CodecError::InvalidStatus(42))));
    let err = decode_frame(&wire_bytes(42, None)).expect_err("invalid status");
    assert!(matches!(err, CodecError::InvalidStatus(42)));
}

#[test]
fn board_payload_survives_encoding() {
    let original = frame(
        Status::Request,
        json!({
            "element": {"id": "e1", "type": "sticky", "x": 1.5, "y": -2.0, "w": 120.0, "h": 80.0,
                        "content": "ship it", "color": "#ffc53d"},
            "stroke": {"id": "s1", "points": [[0.0, 0.0], [3.25, 4.5]], "color": "#000", "width": 2.0},
            "applied": false,
            "gone": null
        }),
    );
    assert_eq!(decode_frame(&encode_frame(&original)).expect("decode"), original);
}

#[test]
fn every_status_survives_encoding() {
    for status in [Status::Request, Status::Item, Status::Bulk, Status::Done, Status::Error, Status::Cancel] {
        let original = frame(status, json!({}));
        assert_eq!(decode_frame(&encode_frame(&original)).expect("decode").status, status);
    }
}

#[test]
fn integers_come_back_as_floats() {
    let decoded = decode_frame(&encode_frame(&frame(Status::Done, json!({"count": 3})))).expect("decode");
    assert_eq!(decoded.data["count"], json!(3.0));
}

#[test]
fn missing_data_decodes_as_empty_object() {
    let decoded = decode_frame(&wire_bytes(0, None)).expect("decode");
    assert_eq!(decoded.data, json!({}));
}

#[test]
fn non_finite_number_decodes_as_null() {
    let nan = prost_types::Value { kind: Some(Kind::NumberValue(f64::INFINITY)) };
    let decoded = decode_frame(&wire_bytes(0, Some(nan))).expect("decode");
    assert_eq!(decoded.data, Value::Null);
}

#[test]
fn garbage_bytes_fail_to_decode() {
    assert!(matches!(decode_frame(&[0xff, 0xff, 0xff]), Err(CodecError::Decode(_))));
}

#[test]
fn oversized_input_is_rejected_before_decoding() {
    let bytes = vec![0u8; MAX_FRAME_BYTES + 1];
    assert!(matches!(decode_frame(&bytes), Err(CodecError::TooLarge(n)) if n == MAX_FRAME_BYTES + 1));
}
