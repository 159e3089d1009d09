//! Shared test helpers for `overtrakt-core` integration tests.
//!
//! In-memory fakes for every core port so sync and auth tests can focus on
//! behaviour instead of boilerplate.

pub mod fakes;
