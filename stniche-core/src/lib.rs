//! Shared primitives for the stniche spatial niche toolkit.
//!
//! `stniche-core` is the foundation the statistics and spatial crates build on:
//!
//! - **Error types** — [`NicheError`] and [`Result`] for structured error handling
//! - **Traits** — Small reporting abstractions like [`Scored`] and [`Summarizable`]

pub mod error;
pub mod traits;

pub use error::{NicheError, Result};
pub use traits::*;
