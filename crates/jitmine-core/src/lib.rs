//! Core types, configuration, and error handling for jitmine.
//!
//! This crate provides the shared foundation used by all other jitmine crates:
//! - [`JitError`]: unified error type using `thiserror`
//! - [`JitConfig`]: configuration loaded from `.jitmine.toml`
//! - Shared types: [`Hunk`], [`CommitMeta`], [`CommitFeature`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{ExtractConfig, JitConfig, MiningConfig};
pub use error::JitError;
pub use types::{is_sorted_by_date, CommitFeature, CommitMeta, Hunk, OutputFormat};

/// A convenience `Result` type for jitmine operations.
pub type Result<T> = std::result::Result<T, JitError>;
