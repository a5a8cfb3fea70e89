// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The request taxonomy and dispatcher
//!
//! Requests are typed envelopes over categories × operations. The numeric
//! form `(category << 16) | op` is only a wire encoding for drivers and
//! the host table. Every dispatched request completes exactly once: with
//! a reply, or with a non-OK result code.

use crate::file::FileHandle;
use crate::iso::Isolate;
use fil_core::{IsoStatus, ReqError, ReqResult, TensorMeta};
use tokio::sync::oneshot;
use tracing::Instrument;

/// Request category. The wire code occupies the high 16 bits of the
/// request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReqCat {
    Dir,
    Stream,
    Prog,
    Dstream,
    Tensor,
}

impl ReqCat {
    pub fn code(self) -> u16 {
        match self {
            ReqCat::Dir => 0x0001,
            ReqCat::Stream => 0x0002,
            ReqCat::Prog => 0x0003,
            ReqCat::Dstream => 0x0004,
            ReqCat::Tensor => 0x0005,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x0001 => ReqCat::Dir,
            0x0002 => ReqCat::Stream,
            0x0003 => ReqCat::Prog,
            0x0004 => ReqCat::Dstream,
            0x0005 => ReqCat::Tensor,
            _ => return None,
        })
    }
}

/// A named directory slot.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub file: FileHandle,
}

/// Directory operations.
#[derive(Debug, Clone)]
pub enum DirReq {
    /// Enumerate every entry.
    List,
    /// Look up one entry; a miss is a successful reply with no entry.
    Find { name: String },
    /// Attach an existing file under `name`.
    Add { name: String, file: FileHandle },
    /// Create a plain child file under `name`.
    New { name: String },
    /// Create a child directory under `name`.
    Newdir { name: String },
    /// Detach the entry under `name`.
    Rm { name: String },
}

/// Byte-stream operations.
#[derive(Debug, Clone)]
pub enum StreamReq {
    Read { offset: u64, size: u64 },
    Write { offset: u64, data: Vec<u8>, tail: bool },
    Truncate { size: u64 },
}

/// Program operations.
#[derive(Debug, Clone)]
pub enum ProgReq {
    Exec,
}

/// Datagram-stream operations: whole-message reads and writes.
#[derive(Debug, Clone)]
pub enum DstreamReq {
    Read { offset: u64, size: u64 },
    Write { offset: u64, data: Vec<u8>, tail: bool },
}

/// Tensor operations.
#[derive(Debug, Clone)]
pub enum TensorReq {
    Meta,
    Fetch,
    Flush,
}

/// A request payload: category with a typed operation.
#[derive(Debug, Clone)]
pub enum ReqPayload {
    Dir(DirReq),
    Stream(StreamReq),
    Prog(ProgReq),
    Dstream(DstreamReq),
    Tensor(TensorReq),
}

impl ReqPayload {
    pub fn cat(&self) -> ReqCat {
        match self {
            ReqPayload::Dir(_) => ReqCat::Dir,
            ReqPayload::Stream(_) => ReqCat::Stream,
            ReqPayload::Prog(_) => ReqCat::Prog,
            ReqPayload::Dstream(_) => ReqCat::Dstream,
            ReqPayload::Tensor(_) => ReqCat::Tensor,
        }
    }

    /// Operation code (the low 16 bits of the request type).
    pub fn op(&self) -> u16 {
        match self {
            ReqPayload::Dir(DirReq::List) => 0x0010,
            ReqPayload::Dir(DirReq::Find { .. }) => 0x0020,
            ReqPayload::Dir(DirReq::Add { .. }) => 0x0030,
            ReqPayload::Dir(DirReq::New { .. }) => 0x0038,
            ReqPayload::Dir(DirReq::Newdir { .. }) => 0x0039,
            ReqPayload::Dir(DirReq::Rm { .. }) => 0x0040,
            ReqPayload::Stream(StreamReq::Read { .. }) => 0x0010,
            ReqPayload::Stream(StreamReq::Write { .. }) => 0x0020,
            ReqPayload::Stream(StreamReq::Truncate { .. }) => 0x0030,
            ReqPayload::Prog(ProgReq::Exec) => 0x0010,
            ReqPayload::Dstream(DstreamReq::Read { .. }) => 0x0010,
            ReqPayload::Dstream(DstreamReq::Write { .. }) => 0x0020,
            ReqPayload::Tensor(TensorReq::Meta) => 0x0010,
            ReqPayload::Tensor(TensorReq::Fetch) => 0x0020,
            ReqPayload::Tensor(TensorReq::Flush) => 0x0028,
        }
    }

    /// Full wire code: `(category << 16) | op`.
    pub fn wire_code(&self) -> u32 {
        (u32::from(self.cat().code()) << 16) | u32::from(self.op())
    }

    /// Dotted operation name for diagnostics, e.g. `dir.find`.
    pub fn name(&self) -> &'static str {
        match self {
            ReqPayload::Dir(DirReq::List) => "dir.list",
            ReqPayload::Dir(DirReq::Find { .. }) => "dir.find",
            ReqPayload::Dir(DirReq::Add { .. }) => "dir.add",
            ReqPayload::Dir(DirReq::New { .. }) => "dir.new",
            ReqPayload::Dir(DirReq::Newdir { .. }) => "dir.newdir",
            ReqPayload::Dir(DirReq::Rm { .. }) => "dir.rm",
            ReqPayload::Stream(StreamReq::Read { .. }) => "stream.read",
            ReqPayload::Stream(StreamReq::Write { .. }) => "stream.write",
            ReqPayload::Stream(StreamReq::Truncate { .. }) => "stream.truncate",
            ReqPayload::Prog(ProgReq::Exec) => "prog.exec",
            ReqPayload::Dstream(DstreamReq::Read { .. }) => "dstream.read",
            ReqPayload::Dstream(DstreamReq::Write { .. }) => "dstream.write",
            ReqPayload::Tensor(TensorReq::Meta) => "tensor.meta",
            ReqPayload::Tensor(TensorReq::Fetch) => "tensor.fetch",
            ReqPayload::Tensor(TensorReq::Flush) => "tensor.flush",
        }
    }
}

/// A dispatched request, as seen by a driver.
pub struct Req {
    pub file: FileHandle,
    pub payload: ReqPayload,
}

/// Reply payload of a completed request.
#[derive(Debug, Clone)]
pub enum Reply {
    None,
    /// Result of `Dir::Find` and the entry-creating directory ops.
    Entry(Option<DirEntry>),
    Entries(Vec<DirEntry>),
    Written(u64),
    Data { data: Vec<u8>, tail: bool },
    Exec(FileHandle),
    TensorMeta(TensorMeta),
    TensorData { meta: TensorMeta, data: Vec<u8> },
}

impl Isolate {
    /// Dispatch a request to a file's driver.
    ///
    /// Stamps the file's `last_touch`, rejects requests after a panic and
    /// requests outside the driver's declared categories, then hands the
    /// envelope to the driver, which owns the single completion.
    pub async fn dispatch(&self, file: &FileHandle, payload: ReqPayload) -> ReqResult<Reply> {
        if self.status() == IsoStatus::Panic {
            return Err(ReqError::Aborted);
        }
        file.touch(self.now_ms());
        if !file.driver().categories().contains(&payload.cat()) {
            return Err(ReqError::Invalid);
        }

        let span = tracing::debug_span!(
            "request",
            file = %file.id(),
            op = payload.name(),
            code = payload.wire_code(),
        );
        let driver = std::sync::Arc::clone(file.driver());
        driver
            .handle(Req {
                file: file.clone(),
                payload,
            })
            .instrument(span)
            .await
    }

    /// Launch a request whose originating scope may end before the reply
    /// arrives. The reply is delivered through the returned channel; drop
    /// the receiver to discard it.
    pub fn dispatch_detached(
        &self,
        file: &FileHandle,
        payload: ReqPayload,
    ) -> oneshot::Receiver<ReqResult<Reply>> {
        let (tx, rx) = oneshot::channel();
        let iso = self.clone();
        let file = file.clone();
        tokio::spawn(async move {
            let _ = tx.send(iso.dispatch(&file, payload).await);
        });
        rx
    }
}

#[cfg(test)]
#[path = "req_tests.rs"]
mod tests;
