//! Assessment-wide state and the report/task synchronisation engine.
//!
//! An assessment is one named run of the interview over a target repository:
//! a set of pillar reports, the permanent question-to-task linkage map, and
//! the evidence application ledger. This module composes the report domain
//! with the external collaborators (catalogue cache, evidence scanners, the
//! Kanbus tracker) behind the operations the CLI exposes. It follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The merge, sync, and orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
