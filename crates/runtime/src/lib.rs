// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fil-runtime: the Filament isolate
//!
//! A single-process virtual filesystem in which every addressable entity
//! is a file handled by a driver. All file, lock, watch, and request state
//! is owned by one cooperative main loop; worker threads exist only for
//! blocking work and report back through the async trigger queue.

pub mod abi;
pub mod dir;
pub mod driver;
pub mod error;
pub mod file;
pub mod iso;
pub mod lock;
pub mod pathfind;
pub mod req;
pub mod sched;
pub mod scratch;
pub mod watch;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use abi::{External, Host, InstallError, HOST_VERSION};
pub use dir::{DirDriver, NullDriver, DIR_DRIVER_NAME, NULL_DRIVER_NAME};
pub use driver::{Driver, DriverCaps};
pub use error::{InitError, NewFileError};
pub use file::{FileHandle, FileNode, FileSpec};
pub use iso::{AsyncHook, Isolate, Options};
pub use lock::{LockError, LockGuard, LockMode, LockReq};
pub use pathfind::{pathfind, PathfindSpec, Resolution};
pub use req::{DirEntry, DirReq, DstreamReq, ProgReq, Reply, Req, ReqCat, ReqPayload, StreamReq, TensorReq};
pub use scratch::{Scratch, ScratchBox};
pub use watch::{WatchEvent, WatchId};
