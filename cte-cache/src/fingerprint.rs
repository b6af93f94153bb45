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

use std::fmt::Debug;
use std::hash::Hash;

/// Marker bound for an opaque, value-equal, hashable key identifying a
/// logically cacheable subplan.
///
/// The manager never inspects a fingerprint's structure; it only hashes,
/// compares, and clones it.
pub trait Fingerprint: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Fingerprint for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
