//! HTTP client shared by the Trakt adapters and notifiers

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
