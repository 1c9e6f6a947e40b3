//! # Curtain Common Library
//!
//! Shared code for the Curtain review tooling:
//! - Common error type
//! - Data root and config file resolution
//! - Publish/opening date helpers

pub mod config;
pub mod dates;
pub mod error;

pub use error::{Error, Result};
