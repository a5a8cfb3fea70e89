// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative shared/exclusive file locks
//!
//! Each file carries a FIFO queue of pending lock requests next to its
//! set of granted holders. A request is granted immediately only when it
//! is compatible with the holders and would starve nobody queued ahead of
//! it; an exclusive waiter blocks every shared request arriving after it.
//! Lock acquisition completes exactly once: with a guard, or with a
//! timeout after the request's budget elapses.

use crate::file::FileHandle;
use fil_core::IsoStatus;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Default lock budget when a request passes `timeout_ms == 0`.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Errors that can occur while acquiring a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("lock timed out")]
    Timeout,
    #[error("lock aborted")]
    Aborted,
}

/// Parameters of a lock request.
///
/// `basetime_ms == 0` means "now"; a backdated basetime shrinks the
/// remaining budget accordingly. `timeout_ms == 0` selects the default.
#[derive(Debug, Clone, Copy)]
pub struct LockReq {
    pub mode: LockMode,
    pub basetime_ms: u64,
    pub timeout_ms: u64,
}

impl LockReq {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            basetime_ms: 0,
            timeout_ms: 0,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_basetime(mut self, basetime_ms: u64) -> Self {
        self.basetime_ms = basetime_ms;
        self
    }
}

struct Waiter {
    seq: u64,
    mode: LockMode,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
pub(crate) struct LockState {
    holders: usize,
    exclusive: bool,
    next_seq: u64,
    queue: VecDeque<Waiter>,
}

impl LockState {
    fn grantable(&self, mode: LockMode) -> bool {
        if !self.queue.is_empty() {
            return false;
        }
        match mode {
            LockMode::Shared => !self.exclusive,
            LockMode::Exclusive => self.holders == 0,
        }
    }

    fn grant(&mut self, mode: LockMode) {
        match mode {
            LockMode::Shared => self.holders += 1,
            LockMode::Exclusive => {
                self.holders = 1;
                self.exclusive = true;
            }
        }
    }

    fn release(&mut self, mode: LockMode) {
        match mode {
            LockMode::Exclusive => {
                self.holders = 0;
                self.exclusive = false;
            }
            LockMode::Shared => self.holders = self.holders.saturating_sub(1),
        }
    }

    /// Grant from the queue head: an exclusive waiter once no holders
    /// remain, otherwise every consecutive shared waiter up to the next
    /// exclusive one. Returns the grant signals to fire.
    fn rescan(&mut self) -> Vec<oneshot::Sender<()>> {
        let mut grants = Vec::new();
        while let Some(head) = self.queue.front() {
            match head.mode {
                LockMode::Exclusive => {
                    if self.holders == 0 {
                        if let Some(w) = self.queue.pop_front() {
                            self.grant(LockMode::Exclusive);
                            grants.push(w.tx);
                        }
                    }
                    break;
                }
                LockMode::Shared => {
                    if self.exclusive {
                        break;
                    }
                    if let Some(w) = self.queue.pop_front() {
                        self.grant(LockMode::Shared);
                        grants.push(w.tx);
                    }
                }
            }
        }
        grants
    }

    fn remove(&mut self, seq: u64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|w| w.seq != seq);
        self.queue.len() != before
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> (usize, bool, usize) {
        (self.holders, self.exclusive, self.queue.len())
    }
}

/// A granted lock. Dropping the guard releases the lock and grants any
/// waiters that become eligible.
#[derive(Debug)]
pub struct LockGuard {
    file: FileHandle,
    mode: LockMode,
}

impl LockGuard {
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// Release explicitly. Equivalent to dropping the guard.
    pub fn unlock(self) {}
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let grants = {
            let mut state = self.file.state.lock();
            state.lock.release(self.mode);
            state.lock.rescan()
        };
        for tx in grants {
            let _ = tx.send(());
        }
    }
}

impl FileHandle {
    /// Acquire a lock on this file.
    ///
    /// Completes immediately when the request is grantable without
    /// starving an earlier waiter; otherwise the request queues in FIFO
    /// order and the future resolves on grant or on timeout. The caller
    /// may issue further lock or request operations from the completion,
    /// including against the same file.
    pub async fn lock(&self, req: LockReq) -> Result<LockGuard, LockError> {
        let iso = self.isolate().ok_or(LockError::Aborted)?;
        if iso.status() == IsoStatus::Panic {
            return Err(LockError::Aborted);
        }

        let timeout_ms = if req.timeout_ms == 0 {
            iso.options().lock_timeout_ms
        } else {
            req.timeout_ms
        };
        let basetime = if req.basetime_ms == 0 {
            iso.now_ms()
        } else {
            req.basetime_ms
        };
        let budget_ms = (basetime + timeout_ms).saturating_sub(iso.now_ms());

        let (seq, rx) = {
            let mut state = self.state.lock();
            let lock = &mut state.lock;
            if lock.grantable(req.mode) {
                lock.grant(req.mode);
                return Ok(LockGuard {
                    file: self.clone(),
                    mode: req.mode,
                });
            }
            let (tx, rx) = oneshot::channel();
            let seq = lock.next_seq;
            lock.next_seq += 1;
            lock.queue.push_back(Waiter {
                seq,
                mode: req.mode,
                tx,
            });
            (seq, rx)
        };

        match tokio::time::timeout(Duration::from_millis(budget_ms), rx).await {
            Ok(Ok(())) => Ok(LockGuard {
                file: self.clone(),
                mode: req.mode,
            }),
            Ok(Err(_)) => Err(LockError::Aborted),
            Err(_elapsed) => {
                let (removed, grants) = {
                    let mut state = self.state.lock();
                    let removed = state.lock.remove(seq);
                    let grants = if removed {
                        state.lock.rescan()
                    } else {
                        Vec::new()
                    };
                    (removed, grants)
                };
                for tx in grants {
                    let _ = tx.send(());
                }
                if removed {
                    Err(LockError::Timeout)
                } else {
                    // The grant landed in the race window between expiry
                    // and removal; the holder slot is already ours.
                    Ok(LockGuard {
                        file: self.clone(),
                        mode: req.mode,
                    })
                }
            }
        }
    }

    pub async fn lock_shared(&self) -> Result<LockGuard, LockError> {
        self.lock(LockReq::new(LockMode::Shared)).await
    }

    pub async fn lock_exclusive(&self) -> Result<LockGuard, LockError> {
        self.lock(LockReq::new(LockMode::Exclusive)).await
    }

    #[cfg(test)]
    pub(crate) fn lock_snapshot(&self) -> (usize, bool, usize) {
        self.state.lock().lock.snapshot()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
