//! # scholarsync-core
//!
//! Core types, traits, and abstractions for the scholarsync pipeline.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other scholarsync crates depend on: the job-posting data model,
//! the enrichment state machine types, and the seams (store, queue, provider,
//! feed) that the database and pipeline crates implement.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
