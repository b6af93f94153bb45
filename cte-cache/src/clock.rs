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

//! A process-wide monotonic logical clock.
//!
//! `create_time` only needs to order successive handles for the same
//! fingerprint (spec.md §3), and `last_access_time` only needs to order
//! accesses for the Evictor's ranking (spec.md §4.3). A strictly increasing
//! counter gives both properties without the platform-dependent resolution
//! issues of wall-clock time, and keeps eviction-order tests deterministic.

use std::sync::atomic::{AtomicU64, Ordering};

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Returns a value strictly greater than every value previously returned by
/// this function in this process.
pub fn tick() -> u64 {
    TICKS.fetch_add(1, Ordering::Relaxed) + 1
}
