//! # Wellspring Common Library
//!
//! Shared code for the Wellspring dashboard aggregator:
//! - Backend response envelope (`{code, message, data, total}`)
//! - Common error types
//! - Configuration loading and resolution

pub mod config;
pub mod envelope;
pub mod error;

pub use envelope::Envelope;
pub use error::{Error, Result};
