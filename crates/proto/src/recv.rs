// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Receive pump for MessagePack traffic on a file
//!
//! Watches a dstream file for updates, reads the bytes, runs them
//! through an unpacker, and yields whole decoded objects. Updates
//! arriving while a read is in flight collapse into one follow-up read.

use crate::msgpack::{Framing, FramingConfig};
use fil_core::FileEvent;
use fil_runtime::{DstreamReq, FileHandle, Isolate, Reply, ReqPayload, WatchId};
use rmpv::Value;
use tokio::sync::mpsc;

/// Streams decoded MessagePack objects off a file.
pub struct Receiver {
    file: FileHandle,
    watch: WatchId,
    out_rx: mpsc::UnboundedReceiver<Value>,
    pump: tokio::task::JoinHandle<()>,
}

impl Receiver {
    /// Attach to `file`, following its `Update` events.
    ///
    /// Bytes already buffered in the file are drained immediately.
    pub fn attach(iso: &Isolate, file: &FileHandle) -> Self {
        let (wake_tx, wake_rx) = mpsc::channel::<()>(1);
        // Prime one read for anything buffered before we attached.
        let _ = wake_tx.try_send(());

        let watch = file.watch(Some(FileEvent::Update), move |_| {
            // Full channel means a read is already pending.
            let _ = wake_tx.try_send(());
        });

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump_loop(iso.clone(), file.clone(), wake_rx, out_tx));

        Self {
            file: file.clone(),
            watch,
            out_rx,
            pump,
        }
    }

    /// The next decoded object; `None` once the pump has stopped.
    pub async fn next(&mut self) -> Option<Value> {
        self.out_rx.recv().await
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.pump.abort();
        self.file.unwatch(self.watch);
    }
}

async fn pump_loop(
    iso: Isolate,
    file: FileHandle,
    mut wake_rx: mpsc::Receiver<()>,
    out_tx: mpsc::UnboundedSender<Value>,
) {
    let mut framing = Framing::new(FramingConfig::default());
    while wake_rx.recv().await.is_some() {
        let reply = iso
            .dispatch(
                &file,
                ReqPayload::Dstream(DstreamReq::Read {
                    offset: 0,
                    size: u64::MAX,
                }),
            )
            .await;
        let data = match reply {
            Ok(Reply::Data { data, .. }) => data,
            _ => return,
        };
        if let Err(err) = framing.feed(&data) {
            tracing::warn!(target: "filament", file = %file.id(), %err, "receive pump stopped");
            return;
        }
        while let Some(value) = framing.pop() {
            if out_tx.send(value).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "recv_tests.rs"]
mod tests;
