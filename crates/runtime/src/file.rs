// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Files and the registry
//!
//! A file is an addressable node owned by the isolate and controlled by a
//! driver. Strong references are `FileHandle`s: cloning one is the ref
//! operation, dropping one the unref. The registry itself keeps only weak
//! entries, so a file is destroyed exactly when its last handle drops:
//! `DeleteN` to watchers, driver deinit, `Delete` to whoever is still
//! watching, then removal from the registry. Ids are never reused.

use crate::driver::Driver;
use crate::error::NewFileError;
use crate::iso::{IsoShared, Isolate};
use crate::lock::LockState;
use crate::watch::WatchState;
use fil_core::{FileEvent, FileId, IsoStatus};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Template for creating a file.
#[derive(Clone)]
pub struct FileSpec {
    pub driver: Arc<dyn Driver>,
    pub path: String,
    pub npath: String,
    pub param: Vec<u8>,
    pub backend: Option<FileHandle>,
}

impl FileSpec {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            path: String::new(),
            npath: String::new(),
            param: Vec::new(),
            backend: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_npath(mut self, npath: impl Into<String>) -> Self {
        self.npath = npath.into();
        self
    }

    pub fn with_param(mut self, param: Vec<u8>) -> Self {
        self.param = param;
        self
    }

    pub fn with_backend(mut self, backend: FileHandle) -> Self {
        self.backend = Some(backend);
        self
    }
}

pub(crate) struct FileState {
    pub(crate) last_touch: u64,
    pub(crate) mimetype: Option<String>,
    pub(crate) cache: u64,
    pub(crate) ctx: Option<Box<dyn Any + Send>>,
    pub(crate) lock: LockState,
    pub(crate) watch: WatchState,
}

impl FileState {
    fn new(now_ms: u64, ctx: Option<Box<dyn Any + Send>>) -> Self {
        Self {
            last_touch: now_ms,
            mimetype: None,
            cache: 0,
            ctx,
            lock: LockState::default(),
            watch: WatchState::default(),
        }
    }
}

/// An addressable node in the isolate.
pub struct FileNode {
    iso: Weak<IsoShared>,
    id: FileId,
    driver: Arc<dyn Driver>,
    path: String,
    npath: String,
    param: Vec<u8>,
    backend: Option<FileHandle>,
    init_ok: AtomicBool,
    pub(crate) state: Mutex<FileState>,
}

/// Strong reference to a file. Clone to retain past a suspension point.
#[derive(Clone)]
pub struct FileHandle {
    pub(crate) node: Arc<FileNode>,
}

impl std::ops::Deref for FileHandle {
    type Target = FileNode;

    fn deref(&self) -> &FileNode {
        &self.node
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("id", &self.id())
            .field("driver", &self.driver().name())
            .finish()
    }
}

impl FileHandle {
    /// Number of live strong references to this file.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }

    /// Whether two handles point at the same file.
    pub fn same_file(&self, other: &FileHandle) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl FileNode {
    pub(crate) fn new_root(
        iso: Weak<IsoShared>,
        driver: Arc<dyn Driver>,
        ctx: Box<dyn Any + Send>,
    ) -> Self {
        Self {
            iso,
            id: FileId::ROOT,
            driver,
            path: "/".to_owned(),
            npath: "/".to_owned(),
            param: Vec::new(),
            backend: None,
            init_ok: AtomicBool::new(true),
            state: Mutex::new(FileState::new(0, Some(ctx))),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn npath(&self) -> &str {
        &self.npath
    }

    pub fn param(&self) -> &[u8] {
        &self.param
    }

    pub fn backend(&self) -> Option<&FileHandle> {
        self.backend.as_ref()
    }

    /// The isolate owning this file, if it is still alive.
    pub fn isolate(&self) -> Option<Isolate> {
        self.iso.upgrade().map(Isolate::from_shared)
    }

    /// Monotonic timestamp of the last request dispatched to this file.
    pub fn last_touch(&self) -> u64 {
        self.state.lock().last_touch
    }

    pub(crate) fn touch(&self, now_ms: u64) {
        self.state.lock().last_touch = now_ms;
    }

    pub fn mimetype(&self) -> Option<String> {
        self.state.lock().mimetype.clone()
    }

    pub fn set_mimetype(&self, mimetype: impl Into<String>) {
        self.state.lock().mimetype = Some(mimetype.into());
    }

    /// Driver-estimated cache cost in bytes.
    pub fn cache_hint(&self) -> u64 {
        self.state.lock().cache
    }

    pub fn set_cache_hint(&self, bytes: u64) {
        self.state.lock().cache = bytes;
    }

    /// Install driver-private context.
    pub fn set_ctx(&self, ctx: Box<dyn Any + Send>) {
        self.state.lock().ctx = Some(ctx);
    }

    pub fn take_ctx(&self) -> Option<Box<dyn Any + Send>> {
        self.state.lock().ctx.take()
    }

    /// Run `f` against the driver context downcast to `T`.
    ///
    /// Returns `None` when no context is installed or the type differs.
    /// The file's state mutex is held for the duration of `f`; do not
    /// re-enter file operations from inside.
    pub fn with_ctx<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.ctx.as_mut()?.downcast_mut::<T>().map(f)
    }
}

impl Drop for FileNode {
    fn drop(&mut self) {
        if self.init_ok.load(Ordering::Relaxed) {
            self.deliver(FileEvent::DeleteN);
            let driver = Arc::clone(&self.driver);
            driver.deinit(self);
            self.deliver(FileEvent::Delete);
        }
        if let Some(iso) = self.iso.upgrade() {
            iso.files.lock().remove(&self.id);
        }
    }
}

impl Isolate {
    /// Create a file from a template.
    ///
    /// Assigns a fresh id and runs the driver's init. On init failure all
    /// registry state is rolled back and the error returned.
    pub fn file_new(&self, spec: FileSpec) -> Result<FileHandle, NewFileError> {
        if self.status() == IsoStatus::Panic {
            return Err(NewFileError::Panicked);
        }
        let shared = self.shared();
        let id = FileId::new(shared.next_id.fetch_add(1, Ordering::Relaxed));
        let node = Arc::new(FileNode {
            iso: Arc::downgrade(shared),
            id,
            driver: spec.driver,
            path: spec.path,
            npath: spec.npath,
            param: spec.param,
            backend: spec.backend,
            init_ok: AtomicBool::new(false),
            state: Mutex::new(FileState::new(self.now_ms(), None)),
        });
        shared.files.lock().insert(id, Arc::downgrade(&node));

        let handle = FileHandle { node };
        let driver = Arc::clone(handle.driver());
        match driver.init(&handle) {
            Ok(()) => {
                handle.node.init_ok.store(true, Ordering::Relaxed);
                Ok(handle)
            }
            Err(err) => {
                shared.files.lock().remove(&id);
                Err(NewFileError::Init(err))
            }
        }
    }

    /// Look up a live file by id.
    pub fn file_get(&self, id: FileId) -> Option<FileHandle> {
        let weak = self.shared().files.lock().get(&id).cloned()?;
        weak.upgrade().map(|node| FileHandle { node })
    }

    /// Number of live files, the root included.
    pub fn file_count(&self) -> usize {
        self.shared()
            .files
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
