//! BDI Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging, and hashing for the BDI workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all BDI workspace members:
//!
//! - **Error Handling**: The [`BdiError`] taxonomy and [`Result`] alias
//! - **Logging**: `tracing` subscriber initialization via [`logging::LogConfig`]
//! - **Hashing**: Deterministic content hashes for record identity
//!
//! # Example
//!
//! ```no_run
//! use bdi_common::{Result, BdiError};
//!
//! fn require_readable(path: &str) -> Result<()> {
//!     if !std::path::Path::new(path).exists() {
//!         return Err(BdiError::FileRead { path: path.to_string() });
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hashing;
pub mod logging;

// Re-export commonly used types
pub use error::{BdiError, Result};
