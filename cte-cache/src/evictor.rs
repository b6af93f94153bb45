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

//! Victim selection for `commit`'s headroom check.
//!
//! Pure function over a [`CacheIndex::snapshot`] — no locking of its own, no
//! knowledge of the monitor or the catalog. `commit` (in [`crate::manager`])
//! is the one that turns the fingerprints this module returns into actual
//! `CacheIndex::invalidate` calls and catalog drops, the same separation the
//! teacher draws between its `Eviction` trait (ranking) and `CacheShard`
//! (mutation).

use std::cmp::Ordering;
use std::sync::Arc;

use crate::fingerprint::Fingerprint;
use crate::handle::Handle;

/// A candidate's ranking key: ascending `(runtime, access_count, data_size,
/// last_access_time)`, with the identifier itself as the final, deterministic
/// tiebreak (spec.md §4.3). Lowest key evicts first — "cheapest to lose".
fn rank_key<F: Fingerprint>(handle: &Handle<F>) -> (u64, u64, u64, u64) {
    (
        handle.runtime(),
        handle.access_count(),
        handle.data_size(),
        handle.last_access_time(),
    )
}

fn compare<F: Fingerprint + Ord>(a: &(F, Arc<Handle<F>>), b: &(F, Arc<Handle<F>>)) -> Ordering {
    rank_key(&a.1)
        .cmp(&rank_key(&b.1))
        .then_with(|| a.0.cmp(&b.0))
}

/// Select fingerprints to invalidate so that freeing their combined weight
/// covers `deficit` bytes.
///
/// `candidates` must already be filtered to `committed && ref_count == 0`
/// (spec.md §4.3's eligibility predicate) — this function only ranks and
/// accumulates. Returns every candidate consumed if the deficit can't be
/// fully covered (spec.md §4.3: "the Evictor still invalidates what it has").
pub fn select_victims<F>(mut candidates: Vec<(F, Arc<Handle<F>>)>, deficit: u64) -> Vec<F>
where
    F: Fingerprint + Ord,
{
    if deficit == 0 {
        return Vec::new();
    }
    candidates.sort_by(compare);

    let mut freed = 0u64;
    let mut victims = Vec::new();
    for (fp, handle) in candidates {
        if freed >= deficit {
            break;
        }
        freed += handle.data_size();
        victims.push(fp);
    }
    victims
}

/// Eligibility predicate shared by the Evictor and by any caller building the
/// candidate set from a full snapshot (spec.md §4.3).
pub fn is_eviction_candidate<F: Fingerprint>(handle: &Handle<F>) -> bool {
    handle.is_committed() && handle.ref_count() == 0
}
