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

//! Recognized configuration (spec.md §6), loaded by the embedding
//! application the same way the teacher expects its `GenericCacheConfig` to
//! be loaded: a plain `serde::Deserialize` struct, no bespoke parser here.

use serde::Deserialize;

fn default_shards() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheManagerConfig {
    /// Master on/off switch. When `false`, every operation degrades to a
    /// no-op and `lookup` always returns `None` (spec.md §6).
    pub cte_materialization_enabled: bool,

    /// Weight budget in bytes (spec.md §6).
    pub execution_data_cache_max_size: u64,

    /// Identity under which catalog operations are performed during
    /// background invalidation (spec.md §6).
    pub caching_user_name: String,

    /// Shard count for `CacheIndex`'s backing map. Ambient: not named by the
    /// specification, required by the sharded-map implementation strategy
    /// (SPEC_FULL.md §6). Defaults to the available parallelism, matching
    /// the teacher's `GenericCacheConfig::shards` default.
    #[serde(default = "default_shards")]
    pub shards: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shards_is_at_least_one() {
        assert!(default_shards() >= 1);
    }

    #[test]
    fn construction_round_trips_fields() {
        let config = CacheManagerConfig {
            cte_materialization_enabled: true,
            execution_data_cache_max_size: 1000,
            caching_user_name: "cte_cache".to_string(),
            shards: 4,
        };
        assert!(config.cte_materialization_enabled);
        assert_eq!(config.execution_data_cache_max_size, 1000);
        assert_eq!(config.shards, 4);
    }
}
