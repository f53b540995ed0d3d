//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: the per-target state machine driven by the orchestrator

mod page_state;

// Re-export main types
pub use page_state::PageState;
