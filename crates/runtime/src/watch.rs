// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watches and event delivery
//!
//! Watchers subscribe to a file's events and are invoked synchronously,
//! in registration order, whenever the file's driver (or the isolate)
//! triggers an event. Watchers registered during a delivery are not fired
//! for the in-progress event; watchers removed during a delivery are
//! skipped. `begin_sync`/`end_sync` bracket a driver-side batch window:
//! `UpdateN` fires when the window opens, and the `Update`s triggered
//! inside it coalesce into one delivery when it closes.

use crate::file::FileNode;
use fil_core::{FileEvent, FileId};
use std::sync::Arc;

/// Identifies a registered watcher on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchId(pub(crate) u64);

/// An event delivered to a watcher.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub file: FileId,
    pub event: FileEvent,
}

type WatchFn = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

struct WatchEntry {
    id: u64,
    filter: Option<FileEvent>,
    cb: WatchFn,
}

#[derive(Default)]
pub(crate) struct WatchState {
    next_id: u64,
    entries: Vec<WatchEntry>,
    sync_depth: u32,
    pending_update: bool,
}

impl FileNode {
    /// Register a watcher. `filter` of `None` subscribes to every event.
    pub fn watch(
        &self,
        filter: Option<FileEvent>,
        cb: impl Fn(&WatchEvent) + Send + Sync + 'static,
    ) -> WatchId {
        let mut state = self.state.lock();
        let watch = &mut state.watch;
        let id = watch.next_id;
        watch.next_id += 1;
        watch.entries.push(WatchEntry {
            id,
            filter,
            cb: Arc::new(cb),
        });
        WatchId(id)
    }

    /// Remove a watcher. Returns whether it was still registered.
    pub fn unwatch(&self, id: WatchId) -> bool {
        let mut state = self.state.lock();
        let watch = &mut state.watch;
        let before = watch.entries.len();
        watch.entries.retain(|e| e.id != id.0);
        watch.entries.len() != before
    }

    /// Deliver `event` to this file's watchers.
    ///
    /// `Preproc`/`Postproc` are dropped unless the driver declares the
    /// matching capability. An `Update` inside a sync window is deferred
    /// to the closing `end_sync`.
    pub fn trigger(&self, event: FileEvent) {
        match event {
            FileEvent::Preproc if !self.driver().caps().preproc => return,
            FileEvent::Postproc if !self.driver().caps().postproc => return,
            FileEvent::Update => {
                let mut state = self.state.lock();
                if state.watch.sync_depth > 0 {
                    state.watch.pending_update = true;
                    return;
                }
            }
            _ => {}
        }
        self.deliver(event);
    }

    /// Open a sync window. Nested windows reference-count.
    pub fn begin_sync(&self) {
        let entered = {
            let mut state = self.state.lock();
            state.watch.sync_depth += 1;
            state.watch.sync_depth == 1
        };
        if entered {
            self.deliver(FileEvent::UpdateN);
        }
    }

    /// Close a sync window, delivering the coalesced `Update` if any.
    pub fn end_sync(&self) {
        let flush = {
            let mut state = self.state.lock();
            let watch = &mut state.watch;
            watch.sync_depth = watch.sync_depth.saturating_sub(1);
            watch.sync_depth == 0 && std::mem::take(&mut watch.pending_update)
        };
        if flush {
            self.deliver(FileEvent::Update);
        }
    }

    pub(crate) fn deliver(&self, event: FileEvent) {
        let snapshot: Vec<(u64, Option<FileEvent>, WatchFn)> = {
            let state = self.state.lock();
            state
                .watch
                .entries
                .iter()
                .map(|e| (e.id, e.filter, Arc::clone(&e.cb)))
                .collect()
        };

        let delivered = WatchEvent {
            file: self.id(),
            event,
        };
        for (id, filter, cb) in snapshot {
            if let Some(want) = filter {
                if want != event {
                    continue;
                }
            }
            let still_registered = {
                let state = self.state.lock();
                state.watch.entries.iter().any(|e| e.id == id)
            };
            if still_registered {
                cb(&delivered);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn watch_count(&self) -> usize {
        self.state.lock().watch.entries.len()
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
