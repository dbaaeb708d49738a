use serde::{Deserialize, Serialize};

/// Round-wide pause flag.
///
/// Owned by whoever drives the frame loop and passed by reference into every
/// subsystem that has to respect it, so "is the game paused" is always an
/// explicit argument instead of process-global state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseContext {
    paused: bool,
}

impl PauseContext {
    pub const RUNNING: PauseContext = PauseContext { paused: false };

    pub fn new(paused: bool) -> Self {
        Self { paused }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns `true` if the flag actually changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_paused_reports_changes_only() {
        let mut pause = PauseContext::default();
        assert!(!pause.is_paused());
        assert!(pause.set_paused(true));
        assert!(!pause.set_paused(true));
        assert!(pause.is_paused());
        assert!(pause.set_paused(false));
        assert_eq!(pause, PauseContext::RUNNING);
    }
}
