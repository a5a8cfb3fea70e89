// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datagram-stream driver over a framing pair
//!
//! Exposes a [`Framing`] as a file: dstream writes feed the unpacker,
//! dstream reads drain the packer's outbound buffer whole. A write that
//! completes at least one inbound object triggers `Update` so consumers
//! can pop. Write windows are staged through the isolate's scratch pool,
//! which bounds transient copies under the same refusal discipline as
//! the framing ceiling.

use crate::msgpack::{Framing, FramingConfig};
use async_trait::async_trait;
use fil_core::{FileEvent, ReqError, ReqResult};
use fil_runtime::{
    Driver, DstreamReq, FileHandle, InitError, Reply, Req, ReqCat, ReqPayload,
};
use rmpv::Value;

pub const CHANNEL_DRIVER_NAME: &str = "fil.msgpack";

/// Driver of MessagePack channel files.
pub struct ChannelDriver {
    config: FramingConfig,
}

impl ChannelDriver {
    pub fn new(config: FramingConfig) -> Self {
        Self { config }
    }
}

impl Default for ChannelDriver {
    fn default() -> Self {
        Self::new(FramingConfig::default())
    }
}

/// Run `f` against a channel file's framing.
///
/// `None` when the file is not a channel file.
pub fn with_framing<R>(file: &FileHandle, f: impl FnOnce(&mut Framing) -> R) -> Option<R> {
    file.with_ctx::<Framing, _>(f)
}

/// Pop the next decoded inbound object off a channel file.
pub fn pop(file: &FileHandle) -> Option<Value> {
    with_framing(file, Framing::pop).flatten()
}

/// Serialise a value onto a channel file's outbound buffer.
pub fn pack(file: &FileHandle, value: &Value) -> ReqResult<()> {
    with_framing(file, |framing| framing.pack(value))
        .ok_or(ReqError::Invalid)?
        .map_err(|err| err.req_error())
}

#[async_trait]
impl Driver for ChannelDriver {
    fn name(&self) -> &str {
        CHANNEL_DRIVER_NAME
    }

    fn categories(&self) -> &[ReqCat] {
        &[ReqCat::Dstream]
    }

    fn init(&self, file: &FileHandle) -> Result<(), InitError> {
        file.set_ctx(Box::new(Framing::new(self.config.clone())));
        file.set_mimetype("application/msgpack");
        Ok(())
    }

    async fn handle(&self, req: Req) -> ReqResult<Reply> {
        let file = &req.file;
        match req.payload {
            ReqPayload::Dstream(DstreamReq::Write { data, .. }) => {
                let iso = file.isolate().ok_or(ReqError::Aborted)?;
                let mut staged = iso.scratch().stack(data.len()).ok_or(ReqError::Nomem)?;
                staged.copy_from_slice(&data);

                let fed = with_framing(file, |framing| framing.feed(&staged))
                    .ok_or(ReqError::Aborted)?;
                iso.scratch().unstack(staged);

                let decoded = fed.map_err(|err| err.req_error())?;
                if decoded > 0 {
                    file.trigger(FileEvent::Update);
                }
                Ok(Reply::Written(data.len() as u64))
            }
            ReqPayload::Dstream(DstreamReq::Read { offset, .. }) => {
                if offset != 0 {
                    return Err(ReqError::Invalid);
                }
                let data = with_framing(file, |framing| {
                    if framing.is_broken() {
                        None
                    } else {
                        Some(framing.take_output())
                    }
                })
                .ok_or(ReqError::Aborted)?
                .ok_or(ReqError::Aborted)?;
                Ok(Reply::Data { data, tail: false })
            }
            _ => Err(ReqError::Invalid),
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
