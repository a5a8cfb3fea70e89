// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The isolate: registry owner and main loop
//!
//! One isolate owns the file registry, the driver index, the scratch
//! pool, and the timer scheduler. All of it is mutated from the single
//! main loop; worker threads talk back exclusively through the async
//! trigger queue. The root directory (id 0) is created with the isolate
//! and lives as long as it does.

use crate::dir::{builtin_drivers, DirDriver};
use crate::driver::Driver;
use crate::file::{FileHandle, FileNode};
use crate::lock;
use crate::sched::Scheduler;
use crate::scratch::Scratch;
use fil_core::{Clock, FileEvent, FileId, IsoStatus, SystemClock};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::Notify;

/// Isolate tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Default lock budget for requests passing `timeout_ms == 0`.
    pub lock_timeout_ms: u64,
    /// Total byte cap of the scratch pool; `None` is unbounded.
    pub scratch_cap: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            lock_timeout_ms: lock::DEFAULT_TIMEOUT_MS,
            scratch_cap: None,
        }
    }
}

type Work = Box<dyn FnOnce(&Isolate) + Send>;
type MsgSink = Box<dyn Fn(&str) + Send + Sync>;

pub(crate) struct IsoShared {
    clock: Arc<dyn Clock>,
    origin: Instant,
    opts: Options,
    status: Mutex<IsoStatus>,
    pub(crate) files: Mutex<HashMap<FileId, Weak<FileNode>>>,
    pub(crate) next_id: AtomicU64,
    pub(crate) drivers: Mutex<IndexMap<String, Arc<dyn Driver>>>,
    scratch: Scratch,
    sched: Mutex<Scheduler>,
    async_tx: mpsc::UnboundedSender<FileId>,
    async_rx: Mutex<mpsc::UnboundedReceiver<FileId>>,
    work_tx: mpsc::UnboundedSender<Work>,
    work_rx: Mutex<mpsc::UnboundedReceiver<Work>>,
    notify: Arc<Notify>,
    sink: Mutex<Option<MsgSink>>,
    root: FileHandle,
}

/// Handle to an isolate. Cloning is cheap and shares the instance.
#[derive(Clone)]
pub struct Isolate {
    shared: Arc<IsoShared>,
}

/// Thread-safe handle workers use to wake a file on the main loop.
///
/// This is the only isolate surface a worker thread may touch.
#[derive(Clone)]
pub struct AsyncHook {
    tx: mpsc::UnboundedSender<FileId>,
    notify: Arc<Notify>,
}

impl AsyncHook {
    /// Enqueue an `Async` delivery to the identified file.
    ///
    /// Returns `false` only when the isolate is gone. If the file dies
    /// before the main loop turns, the message is dropped silently.
    pub fn trigger_async(&self, id: FileId) -> bool {
        let ok = self.tx.send(id).is_ok();
        if ok {
            self.notify.notify_one();
        }
        ok
    }
}

impl Isolate {
    /// Create an isolate with the system clock.
    pub fn new(opts: Options) -> Self {
        Self::with_clock(opts, Arc::new(SystemClock))
    }

    /// Create an isolate against an explicit clock.
    pub fn with_clock(opts: Options, clock: Arc<dyn Clock>) -> Self {
        let (async_tx, async_rx) = mpsc::unbounded_channel();
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let origin = clock.now();
        let scratch = Scratch::new(opts.scratch_cap);

        let mut drivers = IndexMap::new();
        for driver in builtin_drivers() {
            drivers.insert(driver.name().to_owned(), driver);
        }
        let root_driver = drivers
            .get(crate::dir::DIR_DRIVER_NAME)
            .cloned()
            .unwrap_or_else(|| Arc::new(DirDriver));

        let shared = Arc::new_cyclic(|weak: &Weak<IsoShared>| {
            let root_node = Arc::new(FileNode::new_root(
                weak.clone(),
                root_driver,
                DirDriver::fresh_ctx(),
            ));
            let mut files = HashMap::new();
            files.insert(FileId::ROOT, Arc::downgrade(&root_node));

            IsoShared {
                clock,
                origin,
                opts,
                status: Mutex::new(IsoStatus::Running),
                files: Mutex::new(files),
                next_id: AtomicU64::new(1),
                drivers: Mutex::new(drivers),
                scratch,
                sched: Mutex::new(Scheduler::new()),
                async_tx,
                async_rx: Mutex::new(async_rx),
                work_tx,
                work_rx: Mutex::new(work_rx),
                notify: Arc::new(Notify::new()),
                sink: Mutex::new(None),
                root: FileHandle { node: root_node },
            }
        });
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<IsoShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<IsoShared> {
        &self.shared
    }

    pub fn options(&self) -> &Options {
        &self.shared.opts
    }

    pub fn status(&self) -> IsoStatus {
        *self.shared.status.lock()
    }

    /// The root directory. Always alive for the isolate's lifetime.
    pub fn root(&self) -> FileHandle {
        self.shared.root.clone()
    }

    /// Monotonic milliseconds since isolate creation.
    pub fn now_ms(&self) -> u64 {
        self.shared
            .clock
            .now()
            .saturating_duration_since(self.shared.origin)
            .as_millis() as u64
    }

    /// Per-isolate scratch pool.
    pub fn scratch(&self) -> &Scratch {
        &self.shared.scratch
    }

    /// Emit a diagnostic line through the host-routed sink.
    pub fn msg(&self, text: &str) {
        let sink = self.shared.sink.lock();
        match sink.as_ref() {
            Some(sink) => sink(text),
            None => tracing::info!(target: "filament", "{text}"),
        }
    }

    /// Route diagnostics somewhere other than the default trace stream.
    pub fn set_msg_sink(&self, sink: impl Fn(&str) + Send + Sync + 'static) {
        *self.shared.sink.lock() = Some(Box::new(sink));
    }

    /// Leave `Running`, delivering `Shutdown` to every live file.
    ///
    /// `Panic` is terminal: once entered the status never changes again
    /// and no further requests are accepted.
    pub fn exit(&self, status: IsoStatus) {
        {
            let mut current = self.shared.status.lock();
            if *current == IsoStatus::Panic {
                return;
            }
            *current = status;
        }
        if status.is_terminal() {
            for file in self.live_files() {
                file.trigger(FileEvent::Shutdown);
            }
        }
        self.shared.notify.notify_one();
    }

    pub fn shutdown(&self) {
        self.exit(IsoStatus::Shutdown);
    }

    fn live_files(&self) -> Vec<FileHandle> {
        self.shared
            .files
            .lock()
            .values()
            .filter_map(|weak| weak.upgrade())
            .map(|node| FileHandle { node })
            .collect()
    }

    /// Handle workers use to wake files from other threads.
    pub fn async_hook(&self) -> AsyncHook {
        AsyncHook {
            tx: self.shared.async_tx.clone(),
            notify: Arc::clone(&self.shared.notify),
        }
    }

    /// Enqueue an `Async` delivery from the main thread.
    pub fn trigger_async(&self, id: FileId) -> bool {
        self.async_hook().trigger_async(id)
    }

    /// Schedule a `Timer` delivery to `file` after `dur_ms` milliseconds.
    ///
    /// `dur_ms == 0` fires on the next main-loop turn, never
    /// synchronously. A file may have any number of timers pending.
    pub fn trigger_timer(&self, file: &FileHandle, dur_ms: u64) {
        let fires_at = tokio::time::Instant::now() + Duration::from_millis(dur_ms);
        self.shared.sched.lock().set(file.id(), fires_at);
        self.shared.notify.notify_one();
    }

    /// Run a fire-and-forget worker. The worker must not touch files; it
    /// reports back through the hook it is given.
    pub fn start_thread<F>(&self, main: F)
    where
        F: FnOnce(AsyncHook) + Send + 'static,
    {
        let hook = self.async_hook();
        tokio::task::spawn_blocking(move || main(hook));
    }

    /// Run blocking `work` off the main loop, then `done` back on it.
    pub fn start_work<T, F, C>(&self, work: F, done: C)
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        C: FnOnce(&Isolate, T) + Send + 'static,
    {
        let work_tx = self.shared.work_tx.clone();
        let notify = Arc::clone(&self.shared.notify);
        tokio::spawn(async move {
            if let Ok(out) = tokio::task::spawn_blocking(work).await {
                let queued: Work = Box::new(move |iso: &Isolate| done(iso, out));
                if work_tx.send(queued).is_ok() {
                    notify.notify_one();
                }
            }
        });
    }

    /// One non-blocking main-loop turn: deliver queued async triggers,
    /// fire due timers, run completed offloaded work.
    pub fn tick(&self) {
        loop {
            let next = self.shared.async_rx.lock().try_recv();
            let id = match next {
                Ok(id) => id,
                Err(_) => break,
            };
            match self.file_get(id) {
                Some(file) => file.trigger(FileEvent::Async),
                None => tracing::debug!(target: "filament", %id, "async trigger for dead file dropped"),
            }
        }

        let due = self.shared.sched.lock().fired(tokio::time::Instant::now());
        for id in due {
            if let Some(file) = self.file_get(id) {
                file.trigger(FileEvent::Timer);
            }
        }

        loop {
            let next = self.shared.work_rx.lock().try_recv();
            let work = match next {
                Ok(work) => work,
                Err(_) => break,
            };
            work(self);
        }
    }

    /// Drive the main loop until the isolate leaves `Running`.
    pub async fn run(&self) {
        loop {
            if self.status() != IsoStatus::Running {
                return;
            }
            self.tick();

            let deadline = self.shared.sched.lock().next_deadline();
            let notified = self.shared.notify.notified();
            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }
}

#[cfg(test)]
#[path = "iso_tests.rs"]
mod tests;
