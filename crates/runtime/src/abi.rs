// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host table for external drivers
//!
//! A plug-in receives a versioned [`Host`] and hands back an
//! [`External`]: its own version plus the drivers it contributes. The
//! version is `(major << 16) | minor`; a plug-in is accepted when its
//! major matches the host's and its minor does not exceed it. The
//! isolate handle inside the table is the function set of the ABI —
//! file creation/lookup, dispatch, locks, watches, triggers, scratch,
//! diagnostics — with ref/unref realised by handle clone and drop.

use crate::driver::Driver;
use crate::iso::Isolate;
use std::sync::Arc;
use thiserror::Error;

pub const VER_MAJOR: u16 = 0;
pub const VER_MINOR: u16 = 10;

/// The host's ABI version.
pub const HOST_VERSION: u32 = version(VER_MAJOR, VER_MINOR);

pub const fn version(major: u16, minor: u16) -> u32 {
    (major as u32) << 16 | minor as u32
}

pub const fn major_of(ver: u32) -> u16 {
    (ver >> 16) as u16
}

pub const fn minor_of(ver: u32) -> u16 {
    ver as u16
}

/// Whether a plug-in built against `plugin` runs on a `host` table.
pub const fn compatible(host: u32, plugin: u32) -> bool {
    major_of(host) == major_of(plugin) && minor_of(plugin) <= minor_of(host)
}

/// The table handed to a plug-in.
#[derive(Clone)]
pub struct Host {
    pub ver: u32,
    iso: Isolate,
}

impl Host {
    pub fn new(iso: &Isolate) -> Self {
        Self {
            ver: HOST_VERSION,
            iso: iso.clone(),
        }
    }

    /// The isolate entry points of the table.
    pub fn isolate(&self) -> &Isolate {
        &self.iso
    }
}

/// A plug-in's single export: its version and driver list.
pub struct External {
    pub ver: u32,
    pub drivers: Vec<Arc<dyn Driver>>,
}

/// Errors that can occur while installing a plug-in.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("incompatible plug-in version {plugin:#010x} (host {host:#010x})")]
    Version { host: u32, plugin: u32 },
    #[error("duplicate driver name: {0}")]
    Duplicate(String),
}

impl Isolate {
    /// Install a plug-in: verify the version, register every driver.
    ///
    /// Registration is not transactional across drivers; a duplicate
    /// name fails the remainder of the list. Returns the number of
    /// drivers installed.
    pub fn install(&self, ext: External) -> Result<usize, InstallError> {
        if !compatible(HOST_VERSION, ext.ver) {
            return Err(InstallError::Version {
                host: HOST_VERSION,
                plugin: ext.ver,
            });
        }
        let mut installed = 0;
        for driver in ext.drivers {
            self.driver_register(driver)?;
            installed += 1;
        }
        Ok(installed)
    }
}

#[cfg(test)]
#[path = "abi_tests.rs"]
mod tests;
