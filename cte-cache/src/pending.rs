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

//! The `PendingDelete` side table: handles evicted/invalidated/replaced
//! while still referenced, parked here until their last release.
//!
//! Keyed `fingerprint -> create_time -> handle` (spec.md §9: "the design's
//! `PendingDelete` layout matches a nested map") so that multiple generations
//! of the same fingerprint can be pending at once.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::fingerprint::Fingerprint;
use crate::handle::Handle;

/// Auxiliary map guarded by its own lock, structurally parallel to the
/// per-fingerprint waiter map `foyer-memory`'s `CacheShard` keeps alongside
/// its main index.
pub struct PendingDelete<F: Fingerprint> {
    inner: Mutex<HashMap<F, HashMap<u64, Arc<Handle<F>>>>>,
}

impl<F: Fingerprint> Default for PendingDelete<F> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<F: Fingerprint> PendingDelete<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a handle that left the index while still referenced.
    pub fn park(&self, fp: F, handle: Arc<Handle<F>>) {
        let create_time = handle.create_time();
        self.inner
            .lock()
            .entry(fp)
            .or_default()
            .insert(create_time, handle);
    }

    /// Look up a specific generation without removing it.
    pub fn get(&self, fp: &F, create_time: u64) -> Option<Arc<Handle<F>>> {
        self.inner.lock().get(fp).and_then(|gens| gens.get(&create_time).cloned())
    }

    /// Remove a specific generation, pruning the outer entry if it becomes
    /// empty. Returns the handle if it was present.
    pub fn remove(&self, fp: &F, create_time: u64) -> Option<Arc<Handle<F>>> {
        let mut inner = self.inner.lock();
        let gens = inner.get_mut(fp)?;
        let handle = gens.remove(&create_time);
        if gens.is_empty() {
            inner.remove(fp);
        }
        handle
    }

    /// Number of distinct fingerprints with at least one pending generation.
    #[cfg(test)]
    pub fn fingerprint_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Total number of pending generations across all fingerprints.
    pub fn len(&self) -> usize {
        self.inner.lock().values().map(|gens| gens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
