// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-isolate scratch allocation pool
//!
//! Supplies cheap short-lived byte allocations for staging request
//! windows and other callback-scoped state. Releases may arrive in any
//! order relative to allocation. An optional byte cap turns exhaustion
//! into a synchronous refusal, which callers surface as `Nomem`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

const MIN_CLASS: usize = 64;

/// Pooled scratch allocator. Cloning shares the pool.
#[derive(Clone)]
pub struct Scratch {
    pool: Arc<Mutex<Pool>>,
}

struct Pool {
    cap: Option<usize>,
    in_use: usize,
    free: HashMap<usize, Vec<Vec<u8>>>,
}

/// A scratch allocation. Returns to the pool on drop (or via
/// [`Scratch::unstack`]). Contents are unspecified until written.
pub struct ScratchBox {
    data: Vec<u8>,
    len: usize,
    class: usize,
    pool: Weak<Mutex<Pool>>,
}

fn class_of(len: usize) -> usize {
    len.next_power_of_two().max(MIN_CLASS)
}

impl Scratch {
    /// Pool with an optional total byte cap.
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            pool: Arc::new(Mutex::new(Pool {
                cap,
                in_use: 0,
                free: HashMap::new(),
            })),
        }
    }

    /// Allocate `len` bytes; `None` when the cap would be exceeded.
    ///
    /// A zero-length request yields a valid empty allocation.
    pub fn stack(&self, len: usize) -> Option<ScratchBox> {
        let class = class_of(len);
        let mut pool = self.pool.lock();
        if let Some(cap) = pool.cap {
            if pool.in_use + class > cap {
                return None;
            }
        }
        pool.in_use += class;
        let data = pool
            .free
            .get_mut(&class)
            .and_then(Vec::pop)
            .unwrap_or_else(|| vec![0; class]);
        Some(ScratchBox {
            data,
            len,
            class,
            pool: Arc::downgrade(&self.pool),
        })
    }

    /// Release an allocation back to the pool.
    ///
    /// Equivalent to dropping the box; provided so release sites read as
    /// the inverse of [`Scratch::stack`].
    pub fn unstack(&self, boxed: ScratchBox) {
        drop(boxed);
    }

    /// Bytes currently handed out (rounded up to size classes).
    pub fn in_use(&self) -> usize {
        self.pool.lock().in_use
    }
}

impl ScratchBox {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Deref for ScratchBox {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl DerefMut for ScratchBox {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

impl Drop for ScratchBox {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            let mut pool = pool.lock();
            pool.in_use = pool.in_use.saturating_sub(self.class);
            let mut data = std::mem::take(&mut self.data);
            data.resize(self.class, 0);
            pool.free.entry(self.class).or_default().push(data);
        }
    }
}

#[cfg(test)]
#[path = "scratch_tests.rs"]
mod tests;
