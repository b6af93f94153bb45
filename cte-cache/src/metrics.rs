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

//! Ambient observability. Not named by the specification's operations, but
//! carried regardless — a production cache crate reports this whether or not
//! cost-based admission is in scope (see SPEC_FULL.md §5).
//!
//! Thin wrappers over the `metrics` crate's recording macros, the same crate
//! the teacher workspace pins. No state lives here: every call goes straight
//! to whatever recorder the binary installed, exactly like `foyer-memory`'s
//! own metrics touch points.

use metrics::{counter, gauge};

const LOOKUP_HIT: &str = "cte_cache_lookup_hit";
const LOOKUP_MISS: &str = "cte_cache_lookup_miss";
const PUT: &str = "cte_cache_put";
const COMMIT: &str = "cte_cache_commit";
const EVICT: &str = "cte_cache_evict";
const REPLACE: &str = "cte_cache_replace";
const INVALIDATE: &str = "cte_cache_invalidate";
const CATALOG_DROP_FAILED: &str = "cte_cache_catalog_drop_failed";
const MONITOR_CALL_FAILED: &str = "cte_cache_monitor_call_failed";
const CURRENT_SIZE: &str = "cte_cache_current_size";

pub fn record_lookup_hit() {
    counter!(LOOKUP_HIT).increment(1);
}

pub fn record_lookup_miss() {
    counter!(LOOKUP_MISS).increment(1);
}

pub fn record_put() {
    counter!(PUT).increment(1);
}

pub fn record_commit() {
    counter!(COMMIT).increment(1);
}

pub fn record_evict() {
    counter!(EVICT).increment(1);
}

pub fn record_replace() {
    counter!(REPLACE).increment(1);
}

pub fn record_invalidate() {
    counter!(INVALIDATE).increment(1);
}

pub fn record_catalog_drop_failed() {
    counter!(CATALOG_DROP_FAILED).increment(1);
}

pub fn record_monitor_call_failed() {
    counter!(MONITOR_CALL_FAILED).increment(1);
}

pub fn set_current_size(bytes: u64) {
    gauge!(CURRENT_SIZE).set(bytes as f64);
}
