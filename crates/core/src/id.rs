// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File identifier type

use serde::{Deserialize, Serialize};

/// Unique identifier of a file within an isolate.
///
/// Ids are handed out monotonically and never reused for the lifetime of
/// the isolate. Id `0` always names the root directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl FileId {
    /// The root directory of every isolate.
    pub const ROOT: FileId = FileId(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FileId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<FileId> for u64 {
    fn from(id: FileId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
