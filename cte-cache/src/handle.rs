//  Copyright 2026 CTE Cache Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The materialization handle and its lifecycle operations.
//!
//! A [`Handle`] is always held behind `Arc<Handle<F>>`: `CacheIndex`,
//! `PendingDelete`, and every live query share clones of the same `Arc`. The
//! mutable bookkeeping fields (refcount, commit flag, usage counters, and the
//! `Indexed / PendingDelete / Destroyed` lifecycle state) live behind a
//! single [`parking_lot::Mutex`] so that "read refcount, decide a branch,
//! mutate state" is one critical section rather than a race between
//! independent atomics, per the per-handle-guard recommendation in
//! spec.md §9.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock;
use crate::fingerprint::Fingerprint;

/// The three lifecycle phases a handle may be in (spec.md §3, invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Reachable through `CacheIndex::get`.
    Indexed,
    /// Evicted/invalidated/replaced while still referenced; parked in the
    /// `PendingDelete` side table awaiting the last release.
    PendingDelete,
    /// Torn down: monitor unregistered, catalog table dropped (or drop
    /// attempted and given up on per spec.md §7's `CatalogDropFailed`).
    Destroyed,
}

struct Inner {
    ref_count: u64,
    committed: bool,
    access_count: u64,
    last_access_time: u64,
    state: Lifecycle,
    destroyed: bool,
}

/// The unit of cache lifecycle: identity of a materialized subplan plus its
/// mutable usage/commit/refcount bookkeeping.
pub struct Handle<F: Fingerprint> {
    identifier: F,
    data_table: String,
    create_time: u64,
    data_size: u64,
    runtime: u64,
    inner: Mutex<Inner>,
}

impl<F: Fingerprint> fmt::Debug for Handle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Handle")
            .field("identifier", &self.identifier)
            .field("data_table", &self.data_table)
            .field("create_time", &self.create_time)
            .field("data_size", &self.data_size)
            .field("runtime", &self.runtime)
            .field("ref_count", &inner.ref_count)
            .field("committed", &inner.committed)
            .field("state", &inner.state)
            .finish()
    }
}

impl<F: Fingerprint> Handle<F> {
    /// Construct a new, uncommitted, unreferenced handle with a fresh
    /// `create_time`. Callers normally immediately `grab` it as part of
    /// `put`'s admission sequence (spec.md §4.2).
    pub fn new(identifier: F, data_table: impl Into<String>, data_size: u64, runtime: u64) -> Arc<Self> {
        let create_time = clock::tick();
        Arc::new(Self {
            identifier,
            data_table: data_table.into(),
            create_time,
            data_size,
            runtime,
            inner: Mutex::new(Inner {
                ref_count: 0,
                committed: false,
                access_count: 0,
                last_access_time: create_time,
                state: Lifecycle::Indexed,
                destroyed: false,
            }),
        })
    }

    pub fn identifier(&self) -> &F {
        &self.identifier
    }

    pub fn data_table(&self) -> &str {
        &self.data_table
    }

    pub fn create_time(&self) -> u64 {
        self.create_time
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn runtime(&self) -> u64 {
        self.runtime
    }

    pub fn ref_count(&self) -> u64 {
        self.inner.lock().ref_count
    }

    pub fn is_committed(&self) -> bool {
        self.inner.lock().committed
    }

    pub fn access_count(&self) -> u64 {
        self.inner.lock().access_count
    }

    pub fn last_access_time(&self) -> u64 {
        self.inner.lock().last_access_time
    }

    pub fn state(&self) -> Lifecycle {
        self.inner.lock().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// Pin the handle. Called on `put` and on every `lookup` hit.
    pub fn grab(&self) {
        self.inner.lock().ref_count += 1;
    }

    /// Unpin the handle.
    ///
    /// Returns `true` if this release is the one that must now drive
    /// teardown: the handle was in `PendingDelete` and this was its last
    /// reference. The caller (`done`) is responsible for running
    /// `unmonitor`/`drop_table` and removing the handle from `PendingDelete`
    /// — that work happens outside any lock, per spec.md §5.
    pub fn release(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.ref_count == 0 {
            tracing::debug!(identifier = ?self.identifier, "release on handle with refcount already zero, ignoring");
            return false;
        }
        inner.ref_count -= 1;
        inner.ref_count == 0 && inner.state == Lifecycle::PendingDelete && !inner.destroyed
    }

    pub fn mark_committed(&self) {
        self.inner.lock().committed = true;
    }

    /// Record a cache hit.
    pub fn touch(&self) {
        let mut inner = self.inner.lock();
        inner.access_count += 1;
        inner.last_access_time = clock::tick();
    }

    /// Decide the fate of a handle that is leaving `CacheIndex`.
    ///
    /// Returns `true` if the handle has no live holders and must be torn
    /// down by the caller right now (via `mark_destroyed`/`teardown`);
    /// returns `false` if the handle was parked in `PendingDelete` and
    /// teardown is deferred to the release that brings its refcount to
    /// zero. This is the single atomic decision spec.md §9's "Cyclic
    /// lifecycle" note requires: refcount is read and the state transition
    /// is applied in one critical section. Leaves the `destroyed` flag
    /// itself to `mark_destroyed`, so it stays the single double-drop guard.
    pub fn leave_index(&self) -> bool {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, Lifecycle::Indexed);
        if inner.ref_count == 0 {
            inner.state = Lifecycle::Destroyed;
            true
        } else {
            inner.state = Lifecycle::PendingDelete;
            false
        }
    }

    /// Idempotent transition to `Destroyed`. Returns `true` the first time
    /// (caller must run teardown), `false` if another caller already beat it
    /// there — the double-drop protection called for in spec.md §9.
    pub fn mark_destroyed(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return false;
        }
        inner.destroyed = true;
        inner.state = Lifecycle::Destroyed;
        true
    }
}
