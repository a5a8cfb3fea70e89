// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::iso::Options;
use crate::test_support::{blob_file, test_iso};
use fil_core::FakeClock;
use std::sync::Arc;
use std::time::Duration;

#[yare::parameterized(
    dir_list        = { ReqPayload::Dir(DirReq::List), 0x0001_0010 },
    dir_find        = { ReqPayload::Dir(DirReq::Find { name: "x".into() }), 0x0001_0020 },
    dir_new         = { ReqPayload::Dir(DirReq::New { name: "x".into() }), 0x0001_0038 },
    dir_newdir      = { ReqPayload::Dir(DirReq::Newdir { name: "x".into() }), 0x0001_0039 },
    dir_rm          = { ReqPayload::Dir(DirReq::Rm { name: "x".into() }), 0x0001_0040 },
    stream_read     = { ReqPayload::Stream(StreamReq::Read { offset: 0, size: 1 }), 0x0002_0010 },
    stream_write    = { ReqPayload::Stream(StreamReq::Write { offset: 0, data: vec![], tail: false }), 0x0002_0020 },
    stream_truncate = { ReqPayload::Stream(StreamReq::Truncate { size: 0 }), 0x0002_0030 },
    prog_exec       = { ReqPayload::Prog(ProgReq::Exec), 0x0003_0010 },
    dstream_read    = { ReqPayload::Dstream(DstreamReq::Read { offset: 0, size: 1 }), 0x0004_0010 },
    dstream_write   = { ReqPayload::Dstream(DstreamReq::Write { offset: 0, data: vec![], tail: false }), 0x0004_0020 },
    tensor_meta     = { ReqPayload::Tensor(TensorReq::Meta), 0x0005_0010 },
    tensor_fetch    = { ReqPayload::Tensor(TensorReq::Fetch), 0x0005_0020 },
    tensor_flush    = { ReqPayload::Tensor(TensorReq::Flush), 0x0005_0028 },
)]
fn wire_codes(payload: ReqPayload, code: u32) {
    assert_eq!(payload.wire_code(), code);
    assert_eq!(
        u32::from(payload.cat().code()) << 16 | u32::from(payload.op()),
        code
    );
}

#[test]
fn dir_add_wire_code() {
    let iso = test_iso();
    let payload = ReqPayload::Dir(DirReq::Add {
        name: "x".into(),
        file: iso.root(),
    });
    assert_eq!(payload.wire_code(), 0x0001_0030);
    assert_eq!(payload.name(), "dir.add");
}

#[test]
fn cat_codes_round_trip() {
    for cat in [
        ReqCat::Dir,
        ReqCat::Stream,
        ReqCat::Prog,
        ReqCat::Dstream,
        ReqCat::Tensor,
    ] {
        assert_eq!(ReqCat::from_code(cat.code()), Some(cat));
    }
    assert_eq!(ReqCat::from_code(0x0006), None);
}

#[tokio::test]
async fn dispatch_outside_driver_categories_is_invalid() {
    let iso = test_iso();
    let root = iso.root();
    let err = iso
        .dispatch(
            &root,
            ReqPayload::Stream(StreamReq::Read { offset: 0, size: 1 }),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ReqError::Invalid);
}

#[tokio::test]
async fn dispatch_after_panic_is_aborted() {
    let iso = test_iso();
    let root = iso.root();
    iso.exit(fil_core::IsoStatus::Panic);
    let err = iso
        .dispatch(&root, ReqPayload::Dir(DirReq::List))
        .await
        .unwrap_err();
    assert_eq!(err, ReqError::Aborted);
}

#[tokio::test]
async fn dispatch_stamps_last_touch() {
    let clock = Arc::new(FakeClock::new());
    let iso = crate::iso::Isolate::with_clock(Options::default(), clock.clone());
    let root = iso.root();

    clock.advance(Duration::from_millis(321));
    let _ = iso.dispatch(&root, ReqPayload::Dir(DirReq::List)).await;
    assert_eq!(root.last_touch(), 321);
}

#[tokio::test]
async fn detached_dispatch_outlives_the_caller_scope() {
    let iso = test_iso();
    let blob = blob_file(&iso, "blob").await;

    let rx = {
        // The originating scope ends before the reply arrives.
        iso.dispatch_detached(
            &blob,
            ReqPayload::Dstream(DstreamReq::Write {
                offset: 0,
                data: b"payload".to_vec(),
                tail: false,
            }),
        )
    };
    let reply = rx.await.unwrap().unwrap();
    assert!(matches!(reply, Reply::Written(7)));
}

#[tokio::test]
async fn blob_round_trips_bytes() {
    let iso = test_iso();
    let blob = blob_file(&iso, "pipe").await;

    let written = iso
        .dispatch(
            &blob,
            ReqPayload::Dstream(DstreamReq::Write {
                offset: 0,
                data: b"abc".to_vec(),
                tail: false,
            }),
        )
        .await
        .unwrap();
    assert!(matches!(written, Reply::Written(3)));

    let reply = iso
        .dispatch(
            &blob,
            ReqPayload::Dstream(DstreamReq::Read {
                offset: 0,
                size: u64::MAX,
            }),
        )
        .await
        .unwrap();
    match reply {
        Reply::Data { data, .. } => assert_eq!(data, b"abc"),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn blob_rejects_offset_reads() {
    let iso = test_iso();
    let blob = blob_file(&iso, "pipe").await;
    let err = iso
        .dispatch(
            &blob,
            ReqPayload::Dstream(DstreamReq::Read { offset: 4, size: 8 }),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ReqError::Invalid);
}
