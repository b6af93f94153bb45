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

//! The narrow contract to the external validity monitor and catalog
//! (spec.md §4.4, §6).
//!
//! `MonitorBridge` is intentionally thin — register/unregister/check/drop —
//! and carries no internal locking requirement of its own; the manager holds
//! no lock of its own across any of these calls (spec.md §5: "the bridge must
//! not hold internal locks across catalog calls").

use crate::error::{CatalogError, MonitorError};
use crate::fingerprint::Fingerprint;
use crate::handle::Handle;

/// Ability to mint a session under a configured identity, used for
/// background drops during `invalidate_all` (spec.md §6).
pub trait SessionFactory {
    type Session;

    fn create_session(&self, caching_user_name: &str) -> Self::Session;
}

/// The validity monitor + catalog, as seen by the cache core.
pub trait MonitorBridge<F: Fingerprint> {
    type Session;

    /// Register interest in the source tables backing `handle`. Called at
    /// `put`.
    fn monitor(&self, handle: &Handle<F>, session: &Self::Session);

    /// Deregister interest. Called immediately before `drop_table`.
    fn unmonitor(&self, handle: &Handle<F>, session: &Self::Session);

    /// `false` if any source table has mutated since materialization.
    /// A `MonitorError` is treated identically to an explicit `false`
    /// (spec.md §7: `MonitorCallFailed` ≡ stale).
    fn is_valid(&self, handle: &Handle<F>, session: &Self::Session) -> Result<bool, MonitorError>;

    /// Catalog side effect. Must tolerate being asked to drop a table that
    /// is already gone (spec.md §7).
    fn drop_table(&self, handle: &Handle<F>, session: &Self::Session) -> Result<(), CatalogError>;
}
