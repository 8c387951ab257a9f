use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a participant. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Constructed; nothing registered with the network yet.
    Born,
    /// Endpoint listening and handlers registered.
    Initialised,
    /// Ticks are processed.
    Living,
    /// Shutdown in progress.
    Dying,
    /// Terminal; all resources released.
    Dead,
}

impl LifecycleState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Born, Self::Initialised)
                | (Self::Initialised, Self::Living)
                | (Self::Born | Self::Initialised | Self::Living, Self::Dying)
                | (Self::Dying, Self::Dead)
        )
    }

    /// Whether a shutdown has started or finished.
    pub const fn is_terminating(self) -> bool {
        matches!(self, Self::Dying | Self::Dead)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Born => "BORN",
            Self::Initialised => "INITIALISED",
            Self::Living => "LIVING",
            Self::Dying => "DYING",
            Self::Dead => "DEAD",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
