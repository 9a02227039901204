//! Pillar report model, status state machine, and text codec.
//!
//! A pillar report is an ordered sequence of question entries sourced from
//! the immutable Well-Architected catalogue. Entry order is catalogue order
//! and round-trips byte-exactly through the codec, which is what makes
//! concurrent human edits to unrelated entries safe across a
//! read-modify-write cycle. The module follows hexagonal architecture:
//!
//! - Domain types and the status state machine in [`domain`]
//! - The strict parse/serialize codec in [`codec`]

pub mod codec;
pub mod domain;

#[cfg(test)]
pub(crate) mod tests;
