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

//! The one-way `ready` latch (spec.md §5): `isEnabled` must return true only
//! once `ready` has been set, and setting it twice is harmless.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct ReadyLatch {
    ready: AtomicBool,
}

impl ReadyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: flipping an already-set latch is a no-op.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
