// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver interface
//!
//! A driver implements the behaviour of a class of files. It declares a
//! unique name, the request categories it serves, and capability bits the
//! core consults (event gating, timer interest). Per-file state lives in
//! the file's driver-private context, installed during `init`.

use crate::error::InitError;
use crate::file::{FileHandle, FileNode};
use crate::iso::Isolate;
use crate::req::{Reply, Req, ReqCat};
use async_trait::async_trait;
use fil_core::ReqResult;
use std::sync::Arc;

/// Capability flags a driver declares to the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCaps {
    /// The driver polls its backend itself; the core must not.
    pub npoll: bool,
    /// Requests against one file must be serialised by the caller.
    pub mutex: bool,
    /// Deliver `Preproc` events to this driver's files.
    pub preproc: bool,
    /// Deliver `Postproc` events to this driver's files.
    pub postproc: bool,
    /// The driver schedules timers against its files.
    pub timer: bool,
}

/// Behaviour of a class of files.
///
/// `handle` owns the completion of every request it accepts: the returned
/// future resolves exactly once, either with a reply or with a non-OK
/// result code. A driver that cannot take the request returns the error
/// without side effects.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Unique driver name, e.g. `sys.dir`.
    fn name(&self) -> &str;

    /// Request categories this driver serves.
    fn categories(&self) -> &[ReqCat];

    fn caps(&self) -> DriverCaps {
        DriverCaps::default()
    }

    /// Prepare a freshly created file. Failure aborts the creation with
    /// no side effects.
    fn init(&self, file: &FileHandle) -> Result<(), InitError>;

    /// Tear down a dying file. No request is dispatched to the file once
    /// deinit has begun.
    fn deinit(&self, _file: &FileNode) {}

    async fn handle(&self, req: Req) -> ReqResult<Reply>;
}

impl Isolate {
    /// Register a driver under its declared name.
    pub fn driver_register(&self, driver: Arc<dyn Driver>) -> Result<(), crate::abi::InstallError> {
        let mut drivers = self.shared().drivers.lock();
        let name = driver.name().to_owned();
        if drivers.contains_key(&name) {
            return Err(crate::abi::InstallError::Duplicate(name));
        }
        drivers.insert(name, driver);
        Ok(())
    }

    /// Look up a registered driver by name.
    pub fn driver_lookup(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.shared().drivers.lock().get(name).cloned()
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
