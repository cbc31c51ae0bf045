//! Selfie booth phase tracking.

use crate::protocol::SelfiePhase;

/// Last booth phase confirmed by the server.
///
/// The value is kept exactly as pushed (last write wins), so a phase name
/// this client does not know is still reported rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfieTracker {
    current: Option<String>,
}

impl SelfieTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `selfie-state` push.
    pub fn apply_push(&mut self, state: impl Into<String>) {
        self.current = Some(state.into());
    }

    /// The raw phase name, if any push has arrived.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The current phase, if it is one this client knows.
    pub fn phase(&self) -> Option<SelfiePhase> {
        self.current.as_deref().and_then(SelfiePhase::from_name)
    }
}
