//! # Overtrakt API
//!
//! Process layer - HTTP listener, commands and application wiring.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - The webhook and health routes
//! - `serve` and `unsynced` commands
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod http;
pub mod utils;

// Re-export for convenience
pub use commands::Command;
pub use context::AppContext;
