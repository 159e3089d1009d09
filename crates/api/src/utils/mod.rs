//! Process utilities: tracing setup and the health report

pub mod health;
pub mod logging;

pub use health::HealthReport;
pub use logging::{init_tracing, LogFormat};
