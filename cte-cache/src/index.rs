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

//! `CacheIndex`: the weight-bounded-in-spirit, membership-bounded-in-fact
//! `Fingerprint -> Handle` map.
//!
//! Sharded the way `foyer-memory::generic::CacheShard` shards its indexer —
//! a fixed array of lock-guarded `HashMap`s routed by `hash_builder`. Unlike
//! the teacher's shard, there is no intrusive eviction list living alongside
//! the map: victim selection is entirely the Evictor's job (spec.md §4.1,
//! "the *primary* eviction path used by this design is explicit pruning
//! driven by the Evictor, not the container's own background eviction").
//!
//! Mutating operations collect the entries they displace and return them to
//! the caller to disposed of *outside* any shard lock — the same
//! "collect while locked, deallocate after" shape as
//! `CacheShard::insert`'s `last_reference_entries` parameter in the teacher.
//! Disposal (park-or-destroy) is deliberately left to the caller (see
//! [`crate::manager`]) because it needs the `MonitorBridge`, which
//! `CacheIndex` does not know about.

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use ahash::RandomState;
use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::Mutex;

use crate::fingerprint::Fingerprint;
use crate::handle::Handle;

pub struct CacheIndex<F: Fingerprint> {
    shards: Vec<Mutex<HashMap<F, Arc<Handle<F>>>>>,
    hash_builder: RandomState,
}

impl<F: Fingerprint> CacheIndex<F> {
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect_vec(),
            hash_builder: RandomState::default(),
        }
    }

    fn shard_of(&self, fp: &F) -> &Mutex<HashMap<F, Arc<Handle<F>>>> {
        let hash = self.hash_builder.hash_one(fp);
        &self.shards[hash as usize % self.shards.len()]
    }

    /// The currently indexed handle for `fp`, if any. Does not affect
    /// refcount (spec.md §4.1).
    pub fn get(&self, fp: &F) -> Option<Arc<Handle<F>>> {
        self.shard_of(fp).lock().get(fp).cloned()
    }

    /// Like [`Self::get`], but grabs the handle before releasing the shard
    /// lock, so the grab is serialized with any concurrent `invalidate`/
    /// `insert` on the same fingerprint (spec.md §5: a grab on a handle
    /// obtained through the index MUST be serialized with the removal
    /// hook's refcount decision). Callers that decide not to keep the
    /// grab must release it themselves.
    pub fn get_and_grab(&self, fp: &F) -> Option<Arc<Handle<F>>> {
        let shard = self.shard_of(fp).lock();
        let handle = shard.get(fp)?.clone();
        handle.grab();
        Some(handle)
    }

    /// Make `handle` the indexed entry for `fp`.
    ///
    /// Returns the previously indexed handle for `fp`, if any — the caller
    /// must run it through the removal hook with reason `Replaced` (spec.md
    /// §4.1).
    pub fn insert(&self, fp: F, handle: Arc<Handle<F>>) -> Option<Arc<Handle<F>>> {
        self.shard_of(&fp).lock().insert(fp, handle)
    }

    /// Remove each of the given fingerprints. Returns the `(fingerprint,
    /// handle)` pairs that were actually present — the caller runs these
    /// through the removal hook (reason `Evicted` or `Explicit`, depending
    /// on the caller's context).
    pub fn invalidate<I>(&self, fps: I) -> Vec<(F, Arc<Handle<F>>)>
    where
        I: IntoIterator<Item = F>,
    {
        fps.into_iter()
            .filter_map(|fp| {
                let removed = self.shard_of(&fp).lock().remove(&fp);
                removed.map(|handle| (fp, handle))
            })
            .collect()
    }

    /// Remove every entry. Returns all `(fingerprint, handle)` pairs.
    pub fn invalidate_all(&self) -> Vec<(F, Arc<Handle<F>>)> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().drain().collect_vec())
            .collect()
    }

    /// A point-in-time view of every indexed entry, sufficient for the
    /// Evictor to rank candidates (spec.md §4.1).
    pub fn snapshot(&self) -> Vec<(F, Arc<Handle<F>>)> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().iter().map(|(fp, h)| (fp.clone(), h.clone())).collect_vec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
