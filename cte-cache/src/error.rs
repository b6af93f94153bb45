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

//! Collaborator-facing error types.
//!
//! Neither of these ever escapes the manager's public surface (see §7 of the
//! spec: the cache core never throws through its public API). They exist so
//! `MonitorBridge` implementations have something typed to return, and so the
//! manager has something to log at `warn` before recovering.

/// Raised by [`crate::monitor::MonitorBridge::drop_table`] when the catalog
/// rejects or fails a drop. The manager treats the handle as destroyed
/// locally regardless (see spec.md §7, `CatalogDropFailed`), so this error is
/// purely informational for logging.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog rejected drop of table `{table}`: {reason}")]
    DropRejected { table: String, reason: String },
    #[error("catalog unreachable while dropping table `{table}`: {reason}")]
    Unreachable { table: String, reason: String },
}

/// Raised by [`crate::monitor::MonitorBridge::is_valid`] when the validity
/// monitor cannot answer. Treated as "stale" per spec.md §7
/// (`MonitorCallFailed`).
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("validity monitor call failed for table `{table}`: {reason}")]
    CallFailed { table: String, reason: String },
}
