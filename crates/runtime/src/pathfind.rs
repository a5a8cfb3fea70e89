// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path resolution through directory lookups
//!
//! Resolves a slash-separated path one segment at a time: take a shared
//! lock on the current base, issue `Dir::Find`, advance. Each segment's
//! lock is held only for the duration of its lookup. A miss with `create`
//! set grows an intermediate directory instead of failing. The caller
//! detects failure by residual path bytes: `unresolved == 0` means the
//! final file was reached.

use crate::file::FileHandle;
use crate::iso::Isolate;
use crate::req::{DirReq, Reply, ReqPayload};
use fil_core::path;

/// Parameters of a path resolution.
#[derive(Clone)]
pub struct PathfindSpec {
    /// Starting directory; `None` (or an absolute path) means the root.
    pub base: Option<FileHandle>,
    pub path: String,
    /// Create missing intermediate directories while walking.
    pub create: bool,
}

impl PathfindSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            base: None,
            path: path.into(),
            create: false,
        }
    }

    pub fn with_base(mut self, base: FileHandle) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_create(mut self) -> Self {
        self.create = true;
        self
    }
}

/// Outcome of a path resolution.
#[derive(Debug)]
pub struct Resolution {
    /// The deepest file reached.
    pub base: FileHandle,
    /// Residual path bytes; zero when fully resolved.
    pub unresolved: usize,
}

impl Resolution {
    pub fn resolved(&self) -> bool {
        self.unresolved == 0
    }
}

/// Resolve `spec.path` to a file, walking one segment per lookup.
pub async fn pathfind(iso: &Isolate, spec: PathfindSpec) -> Resolution {
    let mut base = if spec.path.starts_with('/') {
        iso.root()
    } else {
        spec.base.unwrap_or_else(|| iso.root())
    };

    if spec.path.len() > path::MAX {
        return Resolution {
            base,
            unresolved: spec.path.len(),
        };
    }

    let mut rest = spec.path.as_str();
    loop {
        rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            return Resolution {
                base,
                unresolved: 0,
            };
        }
        let term = rest.find('/').unwrap_or(rest.len());
        let segment = &rest[..term];

        let guard = match base.lock_shared().await {
            Ok(guard) => guard,
            Err(_) => {
                return Resolution {
                    base,
                    unresolved: rest.len(),
                }
            }
        };

        let found = iso
            .dispatch(
                &base,
                ReqPayload::Dir(DirReq::Find {
                    name: segment.to_owned(),
                }),
            )
            .await;

        let next = match found {
            Ok(Reply::Entry(Some(entry))) => Some(entry.file),
            Ok(Reply::Entry(None)) if spec.create => {
                let made = iso
                    .dispatch(
                        &base,
                        ReqPayload::Dir(DirReq::Newdir {
                            name: segment.to_owned(),
                        }),
                    )
                    .await;
                match made {
                    Ok(Reply::Entry(Some(entry))) => Some(entry.file),
                    _ => None,
                }
            }
            _ => None,
        };
        guard.unlock();

        match next {
            Some(file) => {
                base = file;
                rest = &rest[term..];
            }
            None => {
                return Resolution {
                    base,
                    unresolved: rest.len(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pathfind_tests.rs"]
mod tests;
