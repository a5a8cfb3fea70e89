// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::channel::ChannelDriver;
use fil_runtime::test_support::{blob_file, test_iso};
use fil_runtime::FileSpec;
use std::sync::Arc;

fn map(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}

fn frame_msg(file: Value) -> Value {
    map(vec![
        ("interface", Value::from("encoder")),
        ("command", Value::from("frame")),
        ("param", map(vec![("file", file)])),
    ])
}

#[tokio::test]
async fn encoder_frame_resolves_a_numeric_file_reference() {
    let iso = test_iso();
    let file = blob_file(&iso, "frame-target").await;

    let src = frame_msg(Value::from(file.id().raw()));
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();

    assert_eq!(msg.iface, Iface::Encoder);
    assert_eq!(msg.cmd, Cmd::EncoderFrame);
    match &msg.payload {
        Payload::EncoderFrame { file: resolved } => assert!(resolved.same_file(&file)),
        other => panic!("unexpected payload: {other:?}"),
    }
    assert_eq!(msg.holds().len(), 1);
}

#[tokio::test]
async fn encoder_frame_resolves_a_path_reference() {
    let iso = test_iso();
    let file = blob_file(&iso, "by-path").await;

    let src = frame_msg(Value::from("/by-path"));
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
    match &msg.payload {
        Payload::EncoderFrame { file: resolved } => assert!(resolved.same_file(&file)),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn held_references_keep_the_file_alive() {
    let iso = test_iso();
    // Not attached anywhere: the parse hold is the only retainer.
    let file = iso
        .file_new(FileSpec::new(Arc::new(ChannelDriver::default())))
        .unwrap();
    let id = file.id();

    let src = frame_msg(Value::from(id.raw()));
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
    drop(file);
    assert!(iso.file_get(id).is_some());

    drop(msg);
    assert!(iso.file_get(id).is_none());
}

#[tokio::test]
async fn unresolved_references_report_file_not_found() {
    let iso = test_iso();
    let err = parse(&iso, &frame_msg(Value::from(9999u64)), IfaceSet::all())
        .await
        .unwrap_err();
    assert_eq!(err, ProtoError::FileNotFound);

    let err = parse(&iso, &frame_msg(Value::from("/no/such/file")), IfaceSet::all())
        .await
        .unwrap_err();
    assert_eq!(err, ProtoError::FileNotFound);
}

#[tokio::test]
async fn frame_param_shapes_are_validated() {
    let iso = test_iso();

    // No param map at all.
    let src = map(vec![
        ("interface", Value::from("encoder")),
        ("command", Value::from("frame")),
    ]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::InvalidParam
    );

    // A file reference that is neither integer nor string.
    assert_eq!(
        parse(&iso, &frame_msg(Value::from(true)), IfaceSet::all())
            .await
            .unwrap_err(),
        ProtoError::InvalidParam
    );

    // Negative ids are not valid references.
    assert_eq!(
        parse(&iso, &frame_msg(Value::from(-3i64)), IfaceSet::all())
            .await
            .unwrap_err(),
        ProtoError::InvalidParam
    );
}

#[tokio::test]
async fn payload_free_encoder_commands_parse_clean() {
    let iso = test_iso();
    for (name, cmd) in [
        ("info", Cmd::EncoderInfo),
        ("init", Cmd::EncoderInit),
        ("finalize", Cmd::EncoderFinalize),
    ] {
        let src = map(vec![
            ("interface", Value::from("encoder")),
            ("command", Value::from(name)),
        ]);
        let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
        assert_eq!(msg.cmd, cmd);
        assert!(matches!(msg.payload, Payload::None));
        assert!(msg.holds().is_empty());
    }
}

#[tokio::test]
async fn interface_match_is_case_insensitive() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("ENCODER")),
        ("command", Value::from("info")),
    ]);
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
    assert_eq!(msg.iface, Iface::Encoder);
}

#[tokio::test]
async fn disallowed_interface_is_unknown() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("encoder")),
        ("command", Value::from("info")),
    ]);
    let err = parse(&iso, &src, IfaceSet::object()).await.unwrap_err();
    assert_eq!(err, ProtoError::UnknownInterface);
}

#[tokio::test]
async fn unknown_commands_are_rejected_per_interface() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("encoder")),
        ("command", Value::from("warp")),
    ]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::UnknownCommand
    );

    // Commands do not leak across interfaces.
    let src = map(vec![
        ("interface", Value::from("object")),
        ("command", Value::from("frame")),
    ]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::UnknownCommand
    );
}

#[tokio::test]
async fn malformed_roots_are_rejected() {
    let iso = test_iso();
    assert_eq!(
        parse(&iso, &Value::from(1u64), IfaceSet::all())
            .await
            .unwrap_err(),
        ProtoError::RootNotMap
    );

    let src = map(vec![("command", Value::from("info"))]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::InvalidMsg
    );

    let src = map(vec![
        ("interface", Value::from(7u64)),
        ("command", Value::from("info")),
    ]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::InvalidMsg
    );
}

#[tokio::test]
async fn object_get_and_set_carry_path_and_value() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("object")),
        ("command", Value::from("set")),
        (
            "param",
            map(vec![
                (
                    "path",
                    Value::Array(vec![Value::from("scene"), Value::from(0u64)]),
                ),
                ("value", Value::from(1.25)),
            ]),
        ),
    ]);
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
    assert_eq!(msg.cmd, Cmd::ObjectSet);
    match &msg.payload {
        Payload::Object { path, value } => {
            assert_eq!(path.as_deref().map(<[Value]>::len), Some(2));
            assert_eq!(value.as_ref().and_then(Value::as_f64), Some(1.25));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn object_get_without_param_is_accepted_empty() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("object")),
        ("command", Value::from("get")),
    ]);
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
    match &msg.payload {
        Payload::Object { path, value } => {
            assert!(path.is_none());
            assert!(value.is_none());
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn object_path_must_be_an_array() {
    let iso = test_iso();
    let src = map(vec![
        ("interface", Value::from("object")),
        ("command", Value::from("get")),
        ("param", map(vec![("path", Value::from("not-an-array"))])),
    ]);
    assert_eq!(
        parse(&iso, &src, IfaceSet::all()).await.unwrap_err(),
        ProtoError::InvalidParam
    );
}

#[tokio::test]
async fn object_lock_family_parses_without_payload() {
    let iso = test_iso();
    for (name, cmd) in [
        ("lock", Cmd::ObjectLock),
        ("lockex", Cmd::ObjectLockEx),
        ("unlock", Cmd::ObjectUnlock),
    ] {
        let src = map(vec![
            ("interface", Value::from("object")),
            ("command", Value::from(name)),
        ]);
        let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();
        assert_eq!(msg.cmd, cmd);
        assert!(matches!(msg.payload, Payload::None));
    }
}

#[tokio::test]
async fn param_map_is_carried_on_the_message() {
    let iso = test_iso();
    let file = blob_file(&iso, "carried").await;
    let src = frame_msg(Value::from(file.id().raw()));
    let msg = parse(&iso, &src, IfaceSet::all()).await.unwrap();

    let param = msg.param.as_deref().unwrap();
    let fields = Fields::from_entries(param);
    assert_eq!(fields.req_uint("file").unwrap(), file.id().raw());
}
