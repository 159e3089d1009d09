//! Health report for the `/health` endpoint
//!
//! Two components are checked: the stored credentials row and the token
//! manager's in-memory token. Both must hold an access token for the
//! process to report healthy.

use serde::Serialize;

/// Outcome of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Stored credentials row exists with a non-empty access token.
    pub database: bool,
    /// Token manager currently holds an access token.
    pub trakt: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.trakt
    }

    /// Plain-text body greeting `remote`.
    pub fn render(&self, remote: &str) -> String {
        let state = if self.is_healthy() { "OK" } else { "not OK" };
        format!(
            "Hello {remote}, I'm {state}\n\nDatabase: {}\nTrakt: {}",
            self.database, self.trakt
        )
    }
}
