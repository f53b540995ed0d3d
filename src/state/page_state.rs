//! Page state definitions for tracking a crawl target
//!
//! Each target moves `Pending -> Rendering -> {Saved | BlockedRetry | LoadFailedRetry}`;
//! the retry states loop back to `Rendering` until the retry budget runs out.

use crate::MirrorError;
use std::fmt;

/// Represents the current state of a crawl target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Target has been dequeued but not yet handed to the renderer
    Pending,

    /// The renderer is navigating to the target
    Rendering,

    /// The rendered document matched a block signature; waiting to retry
    BlockedRetry,

    /// Navigation produced no response or a non-success status; waiting to retry
    LoadFailedRetry,

    // ===== Terminal States =====
    /// Document rendered without a block signature and went to the page-save path
    Saved,

    /// Retry budget exhausted without a successful render
    GaveUp,

    /// Target was beyond the maximum depth and dropped
    DepthExceeded,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved | Self::GaveUp | Self::DepthExceeded)
    }

    /// Returns true if the target is waiting out a retry penalty
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::BlockedRetry | Self::LoadFailedRetry)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;
        matches!(
            (self, next),
            (Pending, Rendering)
                | (Pending, DepthExceeded)
                | (Rendering, Saved)
                | (Rendering, BlockedRetry)
                | (Rendering, LoadFailedRetry)
                | (BlockedRetry, Rendering)
                | (BlockedRetry, GaveUp)
                | (LoadFailedRetry, Rendering)
                | (LoadFailedRetry, GaveUp)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: PageState) -> Result<PageState, MirrorError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MirrorError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Converts the page state to its manifest string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::BlockedRetry => "blocked_retry",
            Self::LoadFailedRetry => "load_failed_retry",
            Self::Saved => "saved",
            Self::GaveUp => "gave_up",
            Self::DepthExceeded => "depth_exceeded",
        }
    }

    /// Parses a page state from its manifest string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "rendering" => Some(Self::Rendering),
            "blocked_retry" => Some(Self::BlockedRetry),
            "load_failed_retry" => Some(Self::LoadFailedRetry),
            "saved" => Some(Self::Saved),
            "gave_up" => Some(Self::GaveUp),
            "depth_exceeded" => Some(Self::DepthExceeded),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Rendering,
            Self::BlockedRetry,
            Self::LoadFailedRetry,
            Self::Saved,
            Self::GaveUp,
            Self::DepthExceeded,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
