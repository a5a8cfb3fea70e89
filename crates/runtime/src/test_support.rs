// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake drivers and helpers for tests

use crate::driver::Driver;
use crate::error::InitError;
use crate::file::{FileHandle, FileSpec};
use crate::iso::{Isolate, Options};
use crate::req::{DstreamReq, Reply, Req, ReqCat, ReqPayload, StreamReq};
use crate::watch::{WatchEvent, WatchId};
use async_trait::async_trait;
use fil_core::{ByteBuf, FileEvent, ReqError, ReqResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Fresh isolate with default options.
pub fn test_iso() -> Isolate {
    Isolate::new(Options::default())
}

/// Collects every event delivered to a watched file.
#[derive(Clone, Default)]
pub struct EventSink {
    events: Arc<Mutex<Vec<WatchEvent>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `file` for everything, recording delivered events.
    pub fn attach(&self, file: &FileHandle) -> WatchId {
        let events = Arc::clone(&self.events);
        file.watch(None, move |ev| events.lock().push(ev.clone()))
    }

    pub fn events(&self) -> Vec<FileEvent> {
        self.events.lock().iter().map(|e| e.event).collect()
    }

    pub fn take(&self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.events.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

pub const BLOB_DRIVER_NAME: &str = "test.blob";

/// Byte-queue driver serving both stream and dstream requests.
///
/// Writes append to an in-memory buffer and trigger `Update`; reads
/// drain from the front. Offsets other than zero are rejected, the way
/// a datagram stream refuses partial reads.
pub struct BlobDriver;

#[async_trait]
impl Driver for BlobDriver {
    fn name(&self) -> &str {
        BLOB_DRIVER_NAME
    }

    fn categories(&self) -> &[ReqCat] {
        &[ReqCat::Stream, ReqCat::Dstream]
    }

    fn init(&self, file: &FileHandle) -> Result<(), InitError> {
        file.set_ctx(Box::new(ByteBuf::new()));
        Ok(())
    }

    async fn handle(&self, req: Req) -> ReqResult<Reply> {
        let file = &req.file;
        let io = match req.payload {
            ReqPayload::Stream(StreamReq::Read { offset, size })
            | ReqPayload::Dstream(DstreamReq::Read { offset, size }) => {
                if offset != 0 {
                    return Err(ReqError::Invalid);
                }
                let data = file
                    .with_ctx::<ByteBuf, _>(|buf| {
                        let take = (size as usize).min(buf.len());
                        let data = buf.as_slice()[..take].to_vec();
                        buf.drop_head(take);
                        data
                    })
                    .ok_or(ReqError::Aborted)?;
                return Ok(Reply::Data { data, tail: false });
            }
            ReqPayload::Stream(StreamReq::Write { data, .. })
            | ReqPayload::Dstream(DstreamReq::Write { data, .. }) => data,
            ReqPayload::Stream(StreamReq::Truncate { size }) => {
                file.with_ctx::<ByteBuf, _>(|buf| {
                    let keep = (size as usize).min(buf.len());
                    buf.drop_tail(buf.len() - keep);
                })
                .ok_or(ReqError::Aborted)?;
                return Ok(Reply::None);
            }
            _ => return Err(ReqError::Invalid),
        };

        let len = io.len() as u64;
        let appended = file
            .with_ctx::<ByteBuf, _>(|buf| buf.append(&io))
            .ok_or(ReqError::Aborted)?;
        if !appended {
            return Err(ReqError::Nomem);
        }
        file.trigger(FileEvent::Update);
        Ok(Reply::Written(len))
    }
}

/// Create a blob file attached under the root as `name`.
pub async fn blob_file(iso: &Isolate, name: &str) -> FileHandle {
    let file = iso
        .file_new(FileSpec::new(Arc::new(BlobDriver)).with_path(format!("/{name}")))
        .unwrap_or_else(|_| unreachable!("blob init is infallible"));
    let root = iso.root();
    let _ = iso
        .dispatch(
            &root,
            ReqPayload::Dir(crate::req::DirReq::Add {
                name: name.to_owned(),
                file: file.clone(),
            }),
        )
        .await;
    file
}
