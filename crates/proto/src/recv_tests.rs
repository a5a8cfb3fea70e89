// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fil_runtime::test_support::{blob_file, test_iso};
use std::time::Duration;

fn bytes_of(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    rmpv::encode::write_value(&mut out, value).unwrap();
    out
}

async fn write(iso: &Isolate, file: &FileHandle, data: Vec<u8>) {
    let _ = iso
        .dispatch(
            file,
            ReqPayload::Dstream(DstreamReq::Write {
                offset: 0,
                data,
                tail: false,
            }),
        )
        .await
        .unwrap();
}

async fn next_with_deadline(recv: &mut Receiver) -> Option<Value> {
    tokio::time::timeout(Duration::from_secs(5), recv.next())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn yields_objects_as_they_arrive() {
    let iso = test_iso();
    let file = blob_file(&iso, "wire").await;
    let mut recv = Receiver::attach(&iso, &file);

    write(&iso, &file, bytes_of(&Value::from(1u64))).await;
    assert_eq!(next_with_deadline(&mut recv).await, Some(Value::from(1u64)));

    write(&iso, &file, bytes_of(&Value::from("second"))).await;
    assert_eq!(
        next_with_deadline(&mut recv).await,
        Some(Value::from("second"))
    );
}

#[tokio::test]
async fn drains_bytes_buffered_before_attach() {
    let iso = test_iso();
    let file = blob_file(&iso, "wire").await;
    write(&iso, &file, bytes_of(&Value::from("early"))).await;

    let mut recv = Receiver::attach(&iso, &file);
    assert_eq!(
        next_with_deadline(&mut recv).await,
        Some(Value::from("early"))
    );
}

#[tokio::test]
async fn several_objects_in_one_write_all_arrive() {
    let iso = test_iso();
    let file = blob_file(&iso, "wire").await;
    let mut recv = Receiver::attach(&iso, &file);

    let mut chunk = bytes_of(&Value::from(1u64));
    chunk.extend(bytes_of(&Value::from(2u64)));
    chunk.extend(bytes_of(&Value::from(3u64)));
    write(&iso, &file, chunk).await;

    for expect in 1u64..=3 {
        assert_eq!(
            next_with_deadline(&mut recv).await,
            Some(Value::from(expect))
        );
    }
}

#[tokio::test]
async fn object_split_across_writes_arrives_once_whole() {
    let iso = test_iso();
    let file = blob_file(&iso, "wire").await;
    let mut recv = Receiver::attach(&iso, &file);

    let bytes = bytes_of(&Value::from("fragmented payload"));
    let (head, tail) = bytes.split_at(4);
    write(&iso, &file, head.to_vec()).await;
    write(&iso, &file, tail.to_vec()).await;

    assert_eq!(
        next_with_deadline(&mut recv).await,
        Some(Value::from("fragmented payload"))
    );
}

#[tokio::test]
async fn detached_receiver_stops_watching() {
    let iso = test_iso();
    let file = blob_file(&iso, "wire").await;
    let recv = Receiver::attach(&iso, &file);
    drop(recv);

    // The file keeps working without a pump attached.
    write(&iso, &file, bytes_of(&Value::Nil)).await;
}
