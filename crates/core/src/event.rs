// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File event tags and isolate status

use serde::{Deserialize, Serialize};

/// Events delivered to file watchers.
///
/// The wire tag is 8 bits; the high nibble is the event family. The `*N`
/// variants are pre-notifications: `DeleteN` fires before the driver's
/// deinit, `UpdateN` fires when a sync window opens, ahead of the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEvent {
    Delete,
    Update,
    DeleteN,
    UpdateN,
    Uncache,
    Preproc,
    Postproc,
    Async,
    Timer,
    Shutdown,
}

impl FileEvent {
    /// 8-bit wire tag of this event.
    pub fn tag(self) -> u8 {
        match self {
            FileEvent::Delete => 0x00,
            FileEvent::Update => 0x01,
            FileEvent::DeleteN => 0x10,
            FileEvent::UpdateN => 0x11,
            FileEvent::Uncache => 0x20,
            FileEvent::Preproc => 0x30,
            FileEvent::Postproc => 0x38,
            FileEvent::Async => 0x40,
            FileEvent::Timer => 0x50,
            FileEvent::Shutdown => 0xF0,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => FileEvent::Delete,
            0x01 => FileEvent::Update,
            0x10 => FileEvent::DeleteN,
            0x11 => FileEvent::UpdateN,
            0x20 => FileEvent::Uncache,
            0x30 => FileEvent::Preproc,
            0x38 => FileEvent::Postproc,
            0x40 => FileEvent::Async,
            0x50 => FileEvent::Timer,
            0xF0 => FileEvent::Shutdown,
            _ => return None,
        })
    }

    /// Event family (the high nibble of the tag).
    pub fn family(self) -> u8 {
        self.tag() >> 4
    }

    /// True for the pre-notification variants (`DeleteN`, `UpdateN`).
    pub fn is_pre(self) -> bool {
        matches!(self, FileEvent::DeleteN | FileEvent::UpdateN)
    }
}

impl std::fmt::Display for FileEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileEvent::Delete => "delete",
            FileEvent::Update => "update",
            FileEvent::DeleteN => "delete_n",
            FileEvent::UpdateN => "update_n",
            FileEvent::Uncache => "uncache",
            FileEvent::Preproc => "preproc",
            FileEvent::Postproc => "postproc",
            FileEvent::Async => "async",
            FileEvent::Timer => "timer",
            FileEvent::Shutdown => "shutdown",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle status of an isolate.
///
/// `Panic` is terminal; no further requests are accepted once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsoStatus {
    Panic,
    Running,
    Shutdown,
    Reboot,
}

impl IsoStatus {
    pub fn code(self) -> i32 {
        match self {
            IsoStatus::Panic => -1,
            IsoStatus::Running => 0,
            IsoStatus::Shutdown => 1,
            IsoStatus::Reboot => 2,
        }
    }

    /// True once the isolate has left `Running` for good.
    pub fn is_terminal(self) -> bool {
        !matches!(self, IsoStatus::Running)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
