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

//! A concurrent, weight-bounded cache that memoizes materialized query-plan
//! subtrees into backing tables managed by an external catalog.
//!
//! The core sits at the intersection of three concerns: a weight-bounded
//! index from plan fingerprint to materialization [`handle::Handle`], an
//! explicit reference-count lifecycle that decouples *eviction* from the
//! index from *destruction* of the backing table, and a priority-based
//! [`evictor`] that picks victims among committed, unreferenced entries when
//! admitting a new materialization would exceed the configured weight
//! budget. [`monitor::MonitorBridge`] is the narrow seam to the external
//! validity monitor and catalog.
//!
//! [`manager::MaterializationCacheManager`] is the entry point most callers
//! want.

mod clock;
pub mod config;
pub mod error;
pub mod evictor;
pub mod fingerprint;
pub mod handle;
pub mod index;
pub mod manager;
pub mod metrics;
pub mod monitor;
pub mod pending;
pub mod ready;

pub mod prelude {
    pub use crate::config::CacheManagerConfig;
    pub use crate::error::{CatalogError, MonitorError};
    pub use crate::fingerprint::Fingerprint;
    pub use crate::handle::{Handle, Lifecycle};
    pub use crate::manager::{Lease, MaterializationCacheManager};
    pub use crate::monitor::{MonitorBridge, SessionFactory};
}
