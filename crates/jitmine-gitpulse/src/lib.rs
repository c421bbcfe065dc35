//! Commit history mining and just-in-time metrics.
//!
//! Parses blame listings, keeps the cross-commit history state, and turns
//! each commit's diff and blame into a feature record. Commits must be
//! folded in non-decreasing date order; out-of-order input is rejected.

pub mod blame;
pub mod extract;
pub mod history;
pub mod metrics;
pub mod mining;
