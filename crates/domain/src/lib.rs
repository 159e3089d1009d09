//! # Overtrakt Domain
//!
//! Business domain types and models for Overtrakt.
//!
//! This crate contains:
//! - OAuth credential state and Trakt wire types
//! - Sync ledger rows and media identifier rules
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other Overtrakt crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
