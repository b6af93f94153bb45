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

//! The `MaterializationCacheManager`: glues `CacheIndex`, `PendingDelete`,
//! the Evictor, and a `MonitorBridge` behind the public surface spec.md §6
//! enumerates (`is_enabled`, `lookup`, `put`, `commit`, `done`, `invalidate`,
//! `invalidate_all`, `walk`, `walk_all`, `set_ready`).
//!
//! None of these return `Result`: failures from the bridge are recovered
//! internally per spec.md §7 and surfaced, at most, as `None` — the same
//! "core never throws through its public surface" contract the teacher's own
//! `Cache::get`/`insert` observe by returning plain `Option`s rather than
//! propagating storage-layer errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CacheManagerConfig;
use crate::evictor;
use crate::fingerprint::Fingerprint;
use crate::handle::Handle;
use crate::index::CacheIndex;
use crate::metrics;
use crate::monitor::MonitorBridge;
use crate::pending::PendingDelete;
use crate::ready::ReadyLatch;

/// Why a handle is leaving `CacheIndex`, passed through to the removal hook
/// (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalReason {
    Evicted,
    Explicit,
    Replaced,
    Stale,
}

/// A scoped acquisition guard that calls `done` on drop, including on panic
/// unwind (spec.md §5: "Implementations SHOULD offer a scoped-acquisition
/// wrapper that guarantees `done` on every exit path").
///
/// Exists alongside the literal `done(fp, create_time)` surface operation,
/// not instead of it: callers that need to hold a handle across an `await`
/// boundary or return it from a function still use `done` directly.
pub struct Lease<'a, F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F>,
{
    manager: &'a MaterializationCacheManager<F, M>,
    fp: F,
    create_time: u64,
    handle: Arc<Handle<F>>,
}

impl<'a, F, M> Lease<'a, F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F>,
{
    pub fn handle(&self) -> &Arc<Handle<F>> {
        &self.handle
    }
}

impl<'a, F, M> Drop for Lease<'a, F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F>,
{
    fn drop(&mut self) {
        self.manager.done(&self.fp, self.create_time);
    }
}

pub struct MaterializationCacheManager<F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F>,
{
    config: CacheManagerConfig,
    ready: ReadyLatch,
    index: CacheIndex<F>,
    pending: PendingDelete<F>,
    bridge: M,
    session: M::Session,
    current_size: AtomicU64,
    // Serializes the headroom-check-then-prune-then-add sequence in `commit`
    // (spec.md §5: "compound operations ... are not globally atomic" — this
    // is the implementation's chosen serialization point so two concurrent
    // commits can't both observe headroom and both admit over budget).
    commit_lock: Mutex<()>,
}

impl<F, M> MaterializationCacheManager<F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F> + crate::monitor::SessionFactory<Session = <M as MonitorBridge<F>>::Session>,
{
    pub fn new(config: CacheManagerConfig, bridge: M) -> Self {
        let session = bridge.create_session(&config.caching_user_name);
        let shards = config.shards;
        Self {
            config,
            ready: ReadyLatch::new(),
            index: CacheIndex::new(shards),
            pending: PendingDelete::new(),
            bridge,
            session,
            current_size: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }
}

impl<F, M> MaterializationCacheManager<F, M>
where
    F: Fingerprint + Ord,
    M: MonitorBridge<F>,
{
    pub fn set_ready(&self) {
        self.ready.set_ready();
    }

    /// `true` only once `set_ready` has been called (spec.md §5).
    pub fn is_enabled(&self) -> bool {
        self.ready.is_ready() && self.config.cte_materialization_enabled
    }

    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Acquire)
    }

    /// spec.md §4.5.
    pub fn lookup(&self, fp: &F) -> Option<Arc<Handle<F>>> {
        if !self.is_enabled() {
            return None;
        }
        // Grab while still holding the index's shard lock (spec.md §5): a
        // grab obtained through the index must be serialized with a
        // concurrent removal's refcount decision, or the removal could
        // decide to destroy the handle before this grab lands.
        let handle = self.index.get_and_grab(fp)?;

        match self.bridge.is_valid(&handle, &self.session) {
            Ok(true) => {
                handle.touch();
                metrics::record_lookup_hit();
                Some(handle)
            }
            Ok(false) => {
                tracing::debug!(identifier = ?fp, "lookup observed stale entry, invalidating");
                handle.release();
                self.dispose_stale(fp);
                metrics::record_lookup_miss();
                None
            }
            Err(err) => {
                tracing::warn!(identifier = ?fp, error = %err, "monitor call failed, treating as stale");
                metrics::record_monitor_call_failed();
                handle.release();
                self.dispose_stale(fp);
                metrics::record_lookup_miss();
                None
            }
        }
    }

    /// The `isValid == false` branch of spec.md §4.5, shared between the
    /// genuinely-stale path and the `MonitorCallFailed` recovery path
    /// (spec.md §7: treated identically). Mirrors `invalidate`/
    /// `dispose_removed` rather than re-deciding teardown-vs-park itself, so
    /// the lifecycle transition and the `currentSize` debit stay in one
    /// place.
    fn dispose_stale(&self, fp: &F) {
        for removed in self.index.invalidate([fp.clone()]) {
            self.dispose_removed(removed, RemovalReason::Stale);
        }
    }

    /// spec.md §4.2 admission sequence, step 1.
    pub fn put(&self, fp: F, handle: Arc<Handle<F>>) {
        if !self.is_enabled() {
            return;
        }
        handle.grab();
        self.bridge.monitor(&handle, &self.session);
        if let Some(displaced) = self.index.insert(fp, handle) {
            self.dispose_removed(displaced, RemovalReason::Replaced);
        }
        metrics::record_put();
    }

    /// Like [`Self::put`], but returns a [`Lease`] that releases the
    /// producer's pin automatically (spec.md §5's scoped-acquisition
    /// recommendation), rather than requiring a matching `commit`/`done`
    /// call on every exit path.
    pub fn put_leased(&self, fp: F, handle: Arc<Handle<F>>) -> Lease<'_, F, M> {
        let create_time = handle.create_time();
        self.put(fp.clone(), handle.clone());
        Lease {
            manager: self,
            fp,
            create_time,
            handle,
        }
    }

    /// spec.md §4.2 admission sequence, step 3.
    pub fn commit(&self, fp: &F, handle: &Arc<Handle<F>>) {
        if !self.is_enabled() {
            return;
        }
        // 3a: release the producer's pin before pruning/accounting.
        self.done(fp, handle.create_time());

        let _guard = self.commit_lock.lock();
        let max_size = self.config.execution_data_cache_max_size;
        let current = self.current_size.load(Ordering::Acquire);
        let new_size = handle.data_size();
        if current.saturating_add(new_size) > max_size {
            self.evict(max_size, current, new_size);
        }

        self.current_size.fetch_add(new_size, Ordering::AcqRel);
        metrics::set_current_size(self.current_size.load(Ordering::Acquire));
        handle.mark_committed();
        metrics::record_commit();
    }

    fn evict(&self, max_size: u64, current: u64, new_size: u64) {
        let deficit = (current + new_size).saturating_sub(max_size);
        let candidates: Vec<_> = self
            .index
            .snapshot()
            .into_iter()
            .filter(|(_, h)| evictor::is_eviction_candidate(h))
            .collect();
        let victims = evictor::select_victims(candidates, deficit);
        if victims.is_empty() {
            return;
        }
        for (fp, handle) in self.index.invalidate(victims) {
            self.dispose_removed((fp, handle), RemovalReason::Evicted);
        }
    }

    /// Handle a `(fp, handle)` pair that has just left `CacheIndex` via
    /// `invalidate`, applying the removal hook contract of spec.md §4.1.
    fn dispose_removed(&self, (fp, handle): (F, Arc<Handle<F>>), reason: RemovalReason) {
        if handle.leave_index() {
            self.debit(&handle);
            self.teardown(handle);
        } else {
            self.debit(&handle);
            self.pending.park(fp, handle);
        }
        match reason {
            RemovalReason::Evicted => {
                tracing::debug!("evicted entry");
                metrics::record_evict();
            }
            RemovalReason::Explicit => {
                tracing::debug!("explicitly invalidated entry");
                metrics::record_invalidate();
            }
            RemovalReason::Replaced => {
                tracing::debug!("entry replaced by newer admission");
                metrics::record_replace();
            }
            RemovalReason::Stale => {
                tracing::debug!("stale entry invalidated");
                metrics::record_invalidate();
            }
        }
    }

    /// Debit `currentSize` if, and only if, the handle had previously been
    /// committed (SPEC_FULL.md §9, resolved Open Questions 1 and 4).
    fn debit(&self, handle: &Handle<F>) {
        if handle.is_committed() {
            self.current_size.fetch_sub(handle.data_size(), Ordering::AcqRel);
            metrics::set_current_size(self.current_size.load(Ordering::Acquire));
        }
    }

    fn teardown(&self, handle: Arc<Handle<F>>) {
        if !handle.mark_destroyed() {
            return;
        }
        self.bridge.unmonitor(&handle, &self.session);
        if let Err(err) = self.bridge.drop_table(&handle, &self.session) {
            tracing::warn!(table = handle.data_table(), error = %err, "catalog drop failed, treating handle as destroyed locally");
            metrics::record_catalog_drop_failed();
        }
    }

    /// spec.md §4.6.
    pub fn done(&self, fp: &F, create_time: u64) {
        if let Some(indexed) = self.index.get(fp) {
            if indexed.create_time() == create_time {
                indexed.release();
                return;
            }
        }

        if let Some(pending) = self.pending.get(fp, create_time) {
            if pending.release() {
                self.pending.remove(fp, create_time);
                self.teardown(pending);
            }
            return;
        }

        tracing::debug!(identifier = ?fp, create_time, "done() for unknown handle, treating as late/duplicate release");
    }

    pub fn invalidate<I>(&self, fps: I)
    where
        I: IntoIterator<Item = F>,
    {
        if !self.is_enabled() {
            return;
        }
        for removed in self.index.invalidate(fps) {
            self.dispose_removed(removed, RemovalReason::Explicit);
        }
    }

    pub fn invalidate_all(&self) {
        if !self.is_enabled() {
            return;
        }
        for removed in self.index.invalidate_all() {
            self.dispose_removed(removed, RemovalReason::Explicit);
        }
    }

    /// Apply `f` to every currently indexed `(fingerprint, handle)` pair.
    /// Used by administrative and shutdown paths (spec.md §6).
    pub fn walk(&self, fps: &[F], mut f: impl FnMut(&F, &Arc<Handle<F>>)) {
        for fp in fps {
            if let Some(handle) = self.index.get(fp) {
                f(fp, &handle);
            }
        }
    }

    pub fn walk_all(&self, mut f: impl FnMut(&F, &Arc<Handle<F>>)) {
        for (fp, handle) in self.index.snapshot() {
            f(&fp, &handle);
        }
    }
}
